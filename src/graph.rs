//! Graph sinks: where nodes and edges go once the importer commits them.

use crate::coord::{Coordinate, NodeId};
use crate::encoder::EdgeFlags;

/// Identifier of an edge within a sink, assigned by the sink.
pub type EdgeId = u32;

/// Receives the converted graph.
///
/// `add_node` is called exactly once per assigned node id, during the
/// junction pass, and node positions are never updated afterwards.
/// `add_edge` is called during the edge pass only, after the tag encoder
/// has accepted the way; sinks never see rejected ways.
pub trait GraphSink {
    fn add_node(&mut self, id: NodeId, lat: f64, lon: f64);

    /// Store an edge and return its id. `pillars` is the shape between the
    /// towers and excludes the two tower coordinates themselves.
    fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        distance_m: f64,
        pillars: &[Coordinate],
        flags: EdgeFlags,
    ) -> EdgeId;
}

/// A stored tower node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    pub lat: f64,
    pub lon: f64,
}

/// A stored edge.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub distance_m: f64,
    pub pillars: Vec<Coordinate>,
    pub flags: EdgeFlags,
}

/// In-memory sink. Keeps everything it is given, in commit order; the CLI
/// stages imports here before writing them to disk.
#[derive(Debug, Default)]
pub struct MemGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl MemGraph {
    pub fn new() -> Self {
        MemGraph::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Sum of stored edge distances in meters.
    pub fn total_edge_length_m(&self) -> f64 {
        self.edges.iter().map(|e| e.distance_m).sum()
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

impl GraphSink for MemGraph {
    fn add_node(&mut self, id: NodeId, lat: f64, lon: f64) {
        self.nodes.push(GraphNode { id, lat, lon });
    }

    fn add_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        distance_m: f64,
        pillars: &[Coordinate],
        flags: EdgeFlags,
    ) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        self.edges.push(GraphEdge {
            id,
            from,
            to,
            distance_m,
            pillars: pillars.to_vec(),
            flags,
        });
        id
    }
}
