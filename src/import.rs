//! The two-pass importer: junction detection, then edge construction.
//!
//! Pass 1 scans every run of every accepted road and decides which rounded
//! coordinates become tower nodes: run endpoints, and interior points shared
//! with another run. Everything else interior stays a pillar. Pass 2 replays
//! the same traversal, splits each run into edges at the node coordinates,
//! normalizes the road's attributes into way tags, and commits each edge
//! through the tag encoder to the graph sink.

use log::{debug, info};
use rustc_hash::FxHashSet;

use crate::coord::{CoordRegistry, CoordState, Coordinate, NodeId};
use crate::encoder::{TagEncoder, Way};
use crate::error::{Error, Result};
use crate::geo;
use crate::graph::{EdgeId, GraphSink};
use crate::road::{AcceptAll, AcceptFilter, FeatureSource, Road};

/// Counters from the edge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeStats {
    /// Edges committed to the sink.
    pub committed: usize,
    /// Sub-runs dropped by the encoder (not routable, or empty flags).
    pub rejected: usize,
}

/// Counters from a whole import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub nodes: u32,
    pub edges_committed: usize,
    pub ways_rejected: usize,
}

/// What listeners receive for each committed edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommittedEdge {
    pub edge: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub distance_m: f64,
}

/// Synchronous observer of edge commits.
///
/// Listeners run in registration order, once per committed edge, after the
/// sink has stored it. Rejected ways are never reported.
pub trait EdgeAddedListener {
    fn on_edge_added(&mut self, way: &Way, edge: &CommittedEdge);
}

impl<F> EdgeAddedListener for F
where
    F: FnMut(&Way, &CommittedEdge),
{
    fn on_edge_added(&mut self, way: &Way, edge: &CommittedEdge) {
        self(way, edge)
    }
}

/// Parse a comma-separated attribute list ("name,ref, surface") into
/// copied-tag names. Pieces are trimmed and empty pieces dropped, so a
/// trailing comma or an empty string configure nothing.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Length of one edge: start, over each pillar, to end.
fn way_length_m(start: &Coordinate, pillars: &[Coordinate], end: &Coordinate) -> f64 {
    let mut distance = 0.0;
    let mut previous = start;
    for pillar in pillars {
        distance += geo::distance_m(previous, pillar);
        previous = pillar;
    }
    distance + geo::distance_m(previous, end)
}

/// Converts road geometries into a tower-node graph.
///
/// The importer owns the feature source, the tag encoder, an accept filter,
/// the list of extra attributes to copy onto ways, and the edge-added
/// listeners. The two passes are exposed separately: [`build_junctions`]
/// produces the coordinate registry, and [`build_edges`] consumes it by
/// value, so edges can never be built from a registry that outlives its
/// import or skips the junction pass. [`read_graph`] runs both.
///
/// Both passes traverse the source through a fresh
/// [`open`](FeatureSource::open) and must see the same roads in the same
/// order; node ids are assigned purely by traversal order.
///
/// [`build_junctions`]: GraphImporter::build_junctions
/// [`build_edges`]: GraphImporter::build_edges
/// [`read_graph`]: GraphImporter::read_graph
pub struct GraphImporter<S, E> {
    source: S,
    encoder: E,
    filter: Box<dyn AcceptFilter>,
    tags_to_copy: Vec<String>,
    listeners: Vec<Box<dyn EdgeAddedListener>>,
}

impl<S: FeatureSource, E: TagEncoder> GraphImporter<S, E> {
    pub fn new(source: S, encoder: E) -> Self {
        GraphImporter {
            source,
            encoder,
            filter: Box::new(AcceptAll),
            tags_to_copy: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Replace the accept filter (the default accepts everything).
    pub fn with_filter(mut self, filter: impl AcceptFilter + 'static) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Extra source attributes copied verbatim onto each way, by name.
    pub fn with_copied_tags(mut self, tags: Vec<String>) -> Self {
        self.tags_to_copy = tags;
        self
    }

    /// Register an edge-added listener. Listeners fire synchronously in
    /// registration order.
    pub fn add_listener(&mut self, listener: impl EdgeAddedListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// First pass: detect junctions, assign node ids, emit node positions.
    ///
    /// A coordinate becomes a node when it is the first or last point of a
    /// run, or when it shows up again after being marked a pillar. Repeated
    /// coordinates inside a single run (roundabouts, bad geometry) count
    /// once here. Fails with [`Error::NoJunctions`] if the whole source
    /// yields no node at all.
    pub fn build_junctions(&self, sink: &mut impl GraphSink) -> Result<CoordRegistry> {
        let mut registry = CoordRegistry::new();
        let mut seen_in_run: FxHashSet<Coordinate> = FxHashSet::default();
        let mut point_counter: u64 = 0;

        let roads = self.source.open()?;
        for road in roads {
            let road = road?;
            if !self.filter.accept(&road) {
                continue;
            }

            for run in &road.runs {
                seen_in_run.clear();
                let last = run.len().saturating_sub(1);
                for (i, point) in run.iter().copied().enumerate() {
                    if !seen_in_run.insert(point) {
                        continue;
                    }

                    let state = registry.lookup(&point);
                    if state.is_node() {
                        continue;
                    }

                    if i == 0 || i == last || state == CoordState::Pillar {
                        let id = registry.assign_node(point);
                        sink.add_node(id, point.lat(), point.lon());
                    } else {
                        registry.mark_pillar(point);
                    }

                    point_counter += 1;
                    if point_counter % 100_000 == 0 {
                        debug!(
                            "{point_counter} junction points, registry size {}",
                            registry.len()
                        );
                    }
                }
            }
        }

        if registry.node_count() == 0 {
            return Err(Error::NoJunctions {
                source: self.source.describe(),
            });
        }

        info!("Junction pass complete: {} tower nodes", registry.node_count());
        Ok(registry)
    }

    /// Second pass: split runs into edges at node coordinates and commit
    /// them.
    ///
    /// Takes the registry by value; it is read-only here and dropped when
    /// the pass returns. Unlike the junction pass, repeated coordinates are
    /// not skipped, so degenerate input can produce duplicated pillars or a
    /// zero-length loop edge. Both passes must walk the same roads in the
    /// same order or the pass fails with [`Error::PassMismatch`].
    pub fn build_edges(
        &mut self,
        registry: CoordRegistry,
        sink: &mut impl GraphSink,
    ) -> Result<EdgeStats> {
        let mut stats = EdgeStats::default();
        let mut edge_counter: u64 = 0;

        let roads = self.source.open()?;
        for road in roads {
            let road = road?;
            if !self.filter.accept(&road) {
                continue;
            }

            for run in &road.runs {
                // Split the run into individual edges wherever a point is a
                // registered node.
                let mut start: Option<Coordinate> = None;
                let mut pillars: Vec<Coordinate> = Vec::new();

                for point in run.iter().copied() {
                    let Some(start_pnt) = start else {
                        start = Some(point);
                        continue;
                    };

                    match registry.lookup(&point) {
                        CoordState::Node(to_id) => {
                            let from_id = registry
                                .lookup(&start_pnt)
                                .node_id()
                                .ok_or(Error::PassMismatch { road_id: road.id })?;

                            if self.commit_edge(
                                &road, from_id, to_id, &start_pnt, &point, &pillars, sink,
                            )? {
                                stats.committed += 1;
                            } else {
                                stats.rejected += 1;
                            }

                            start = Some(point);
                            pillars.clear();

                            edge_counter += 1;
                            if edge_counter % 1_000_000 == 0 {
                                debug!("{edge_counter} edges built");
                            }
                        }
                        _ => pillars.push(point),
                    }
                }
            }
        }

        info!(
            "Edge pass complete: {} edges committed, {} ways rejected",
            stats.committed, stats.rejected
        );
        Ok(stats)
    }

    /// Run both passes and summarize. The registry never escapes.
    pub fn read_graph(&mut self, sink: &mut impl GraphSink) -> Result<ImportSummary> {
        let registry = self.build_junctions(sink)?;
        let nodes = registry.node_count();
        let stats = self.build_edges(registry, sink)?;
        Ok(ImportSummary {
            nodes,
            edges_committed: stats.committed,
            ways_rejected: stats.rejected,
        })
    }

    /// Normalize one sub-run's attributes into a way, run it through the
    /// encoder, and commit it. Returns whether an edge was stored.
    fn commit_edge(
        &mut self,
        road: &Road,
        from: NodeId,
        to: NodeId,
        start: &Coordinate,
        end: &Coordinate,
        pillars: &[Coordinate],
        sink: &mut impl GraphSink,
    ) -> Result<bool> {
        let distance_m = way_length_m(start, pillars, end);

        let mut way = Way::new(road.id);
        way.estimated_distance_m = distance_m;
        way.estimated_center = Some(geo::midpoint(start, end));

        // Geofabrik road-class column.
        if let Some(fclass) = road.attr("fclass") {
            way.set_tag("highway", fclass);
        }

        // maxspeed 0 means no data in Geofabrik extracts.
        if let Some(maxspeed) = road.attr("maxspeed") {
            if maxspeed.trim() != "0" {
                way.set_tag("maxspeed", maxspeed);
            }
        }

        for tag in &self.tags_to_copy {
            if let Some(value) = road.attr(tag) {
                way.set_tag(tag, value);
            }
        }

        // Geofabrik's oneway convention, mapped back to the standard
        // vocabulary so encoders see familiar values.
        if let Some(oneway) = road.attr("oneway") {
            let value = oneway.trim().to_lowercase();
            match value.as_str() {
                "b" => way.set_tag("oneway", "no"),
                "t" => way.set_tag("oneway", "-1"),
                "f" => way.set_tag("oneway", "yes"),
                "" => {}
                _ => {
                    return Err(Error::InvalidOneway {
                        road_id: road.id,
                        value,
                    })
                }
            }
        }

        let Some(access) = self.encoder.accept_way(&way) else {
            return Ok(false);
        };

        let flags = self.encoder.encode(&way, access);
        if flags.is_empty() {
            return Ok(false);
        }

        let edge = sink.add_edge(from, to, distance_m, pillars, flags);

        if !self.listeners.is_empty() {
            let committed = CommittedEdge {
                edge,
                from,
                to,
                distance_m,
            };
            for listener in &mut self.listeners {
                listener.on_edge_added(&way, &committed);
            }
        }

        Ok(true)
    }
}
