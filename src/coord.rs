//! Coordinate rounding, promotion state, and node-id assignment.
//!
//! Every geometry point is rounded to 6 decimal degrees before anything else
//! looks at it, so "the same coordinate" always means "the same rounded
//! coordinate". The registry tracks what each rounded coordinate has become
//! during the junction pass and owns the sequential node-id counter.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHashMap;

/// Fixed-point scale: 6 decimal digits, ~0.11 m of longitude at the equator.
pub const COORD_SCALE: f64 = 1_000_000.0;

/// First id handed out by the registry. 0 is never a valid node id, so
/// downstream stores can use it as a missing-node marker.
pub const FIRST_NODE_ID: NodeId = 1;

/// Identifier of a tower node in the output graph.
pub type NodeId = u32;

/// Round a degree (or elevation) value to 6 decimal places.
pub fn round6(value: f64) -> f64 {
    (value * COORD_SCALE).round() / COORD_SCALE
}

/// A rounded geometry point.
///
/// Longitude and latitude are stored fixed-point at [`COORD_SCALE`], so the
/// rounding happens in the conversion and equality/hashing are exact integer
/// comparisons. Elevation rides along for shape fidelity but is excluded
/// from identity: coordinate keys are planar.
#[derive(Debug, Clone, Copy)]
pub struct Coordinate {
    lon_e6: i32,
    lat_e6: i32,
    ele: Option<f64>,
}

impl Coordinate {
    /// Build from degree values, rounding to 6 decimals.
    pub fn new(lon: f64, lat: f64) -> Self {
        Coordinate {
            lon_e6: (lon * COORD_SCALE).round() as i32,
            lat_e6: (lat * COORD_SCALE).round() as i32,
            ele: None,
        }
    }

    /// Build with an elevation, rounded like the planar components.
    pub fn with_ele(lon: f64, lat: f64, ele: f64) -> Self {
        Coordinate {
            ele: Some(round6(ele)),
            ..Coordinate::new(lon, lat)
        }
    }

    pub fn lon(&self) -> f64 {
        self.lon_e6 as f64 / COORD_SCALE
    }

    pub fn lat(&self) -> f64 {
        self.lat_e6 as f64 / COORD_SCALE
    }

    pub fn ele(&self) -> Option<f64> {
        self.ele
    }

    /// Raw fixed-point longitude (micro-degrees).
    pub fn lon_e6(&self) -> i32 {
        self.lon_e6
    }

    /// Raw fixed-point latitude (micro-degrees).
    pub fn lat_e6(&self) -> i32 {
        self.lat_e6
    }

    /// Rebuild from stored fixed-point components.
    pub fn from_e6(lon_e6: i32, lat_e6: i32) -> Self {
        Coordinate {
            lon_e6,
            lat_e6,
            ele: None,
        }
    }
}

// Identity is (lon, lat) only. Two points differing solely in elevation are
// the same coordinate for junction detection and registry lookups.
impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lon_e6 == other.lon_e6 && self.lat_e6 == other.lat_e6
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lon_e6.hash(state);
        self.lat_e6.hash(state);
    }
}

/// What a rounded coordinate has become during the junction pass.
///
/// States only move forward: `Unknown -> Pillar -> Node` or
/// `Unknown -> Node`. A `Node` entry is never downgraded or reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordState {
    /// Not seen yet.
    Unknown,
    /// Seen as an interior point of one run; becomes a node if seen again.
    Pillar,
    /// Promoted to a tower node.
    Node(NodeId),
}

impl CoordState {
    pub fn is_node(&self) -> bool {
        matches!(self, CoordState::Node(_))
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            CoordState::Node(id) => Some(*id),
            _ => None,
        }
    }
}

/// Promotion state for every coordinate seen so far, plus the node-id
/// counter.
///
/// Created empty before the junction pass, mutated only by it, then handed
/// read-only to the edge pass and dropped when that pass returns. The
/// promotion policy (which points become nodes) lives in the importer; the
/// registry only records the outcome.
#[derive(Debug)]
pub struct CoordRegistry {
    states: FxHashMap<Coordinate, CoordState>,
    next_node_id: NodeId,
}

impl CoordRegistry {
    pub fn new() -> Self {
        CoordRegistry {
            states: FxHashMap::default(),
            next_node_id: FIRST_NODE_ID,
        }
    }

    /// State of a coordinate; never-seen coordinates report `Unknown`.
    pub fn lookup(&self, coord: &Coordinate) -> CoordState {
        self.states
            .get(coord)
            .copied()
            .unwrap_or(CoordState::Unknown)
    }

    /// Record an interior point. The caller checks the coordinate is
    /// currently `Unknown`; marking anything else is a caller bug.
    pub fn mark_pillar(&mut self, coord: Coordinate) {
        let prev = self.states.insert(coord, CoordState::Pillar);
        debug_assert!(prev.is_none(), "pillar mark over existing state");
    }

    /// Promote a coordinate to a tower node and hand out the next id.
    ///
    /// Ids start at [`FIRST_NODE_ID`] and increase by exactly one per call,
    /// so assignment order is recoverable from the ids alone.
    pub fn assign_node(&mut self, coord: Coordinate) -> NodeId {
        let id = self.next_node_id;
        let prev = self.states.insert(coord, CoordState::Node(id));
        debug_assert!(
            !matches!(prev, Some(CoordState::Node(_))),
            "node id reassigned"
        );
        self.next_node_id += 1;
        id
    }

    /// Number of coordinates tracked (pillars and nodes together).
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of node ids handed out so far.
    pub fn node_count(&self) -> u32 {
        self.next_node_id - FIRST_NODE_ID
    }

    /// Drop all state and reset the id counter.
    pub fn clear(&mut self) {
        self.states.clear();
        self.next_node_id = FIRST_NODE_ID;
    }
}

impl Default for CoordRegistry {
    fn default() -> Self {
        CoordRegistry::new()
    }
}
