//! Towergraph converts road geometries into a routable graph.
//!
//! Poly-line road features come in through a [`FeatureSource`]; two passes
//! turn them into tower nodes and edges: [`GraphImporter::build_junctions`]
//! decides which rounded coordinates become graph vertices, and
//! [`GraphImporter::build_edges`] splits every geometry into edges at those
//! vertices, normalizes the feature's attributes into way tags, and commits
//! each edge through a [`TagEncoder`] to a [`GraphSink`].
//!
//! ```no_run
//! use towergraph::{CarTagEncoder, GeoJsonSource, GraphImporter, MemGraph};
//!
//! # fn main() -> towergraph::Result<()> {
//! let source = GeoJsonSource::new("roads.geojson");
//! let mut importer = GraphImporter::new(source, CarTagEncoder);
//! let mut graph = MemGraph::new();
//! let summary = importer.read_graph(&mut graph)?;
//! println!("{} nodes, {} edges", summary.nodes, summary.edges_committed);
//! # Ok(())
//! # }
//! ```

pub mod coord;
pub mod encoder;
pub mod error;
pub mod geo;
pub mod geojson;
pub mod graph;
pub mod import;
pub mod road;
pub mod storage;

pub use coord::{round6, CoordRegistry, CoordState, Coordinate, NodeId};
pub use encoder::{CarTagEncoder, EdgeFlags, TagEncoder, Way, WayAccess};
pub use error::{Error, Result};
pub use geojson::GeoJsonSource;
pub use graph::{EdgeId, GraphEdge, GraphNode, GraphSink, MemGraph};
pub use import::{
    parse_tag_list, CommittedEdge, EdgeAddedListener, EdgeStats, GraphImporter, ImportSummary,
};
pub use road::{AcceptAll, AcceptFilter, FeatureSource, MemorySource, Road};
pub use storage::{GraphFile, GraphFileInfo};
