//! Road features and the sources that supply them.

use std::collections::HashMap;

use crate::coord::Coordinate;
use crate::error::Result;

/// One road feature: a stable id, one or more line runs, and raw string
/// attributes as they appear in the source data.
///
/// A road with multiple runs is one feature whose geometry is split into
/// disjoint poly-lines; every run shares the road's id and attributes.
#[derive(Debug, Clone)]
pub struct Road {
    pub id: i64,
    pub runs: Vec<Vec<Coordinate>>,
    pub attributes: HashMap<String, String>,
}

impl Road {
    pub fn new(id: i64, runs: Vec<Vec<Coordinate>>) -> Self {
        Road {
            id,
            runs,
            attributes: HashMap::new(),
        }
    }

    /// Chainable attribute setter, mostly for building fixtures.
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Total point count across all runs.
    pub fn point_count(&self) -> usize {
        self.runs.iter().map(Vec::len).sum()
    }
}

/// Supplies road features for import.
///
/// The importer traverses the source twice (junction pass, then edge pass)
/// and requires both traversals to yield the same roads in the same order.
/// Each pass calls [`open`](FeatureSource::open) once; dropping the
/// iterator releases whatever the source holds open.
pub trait FeatureSource {
    type Iter: Iterator<Item = Result<Road>>;

    /// Begin a fresh traversal.
    fn open(&self) -> Result<Self::Iter>;

    /// Human-readable name for logs and error messages.
    fn describe(&self) -> String;
}

/// Decides which roads participate in the import.
///
/// Applied identically in both passes, so a rejected road contributes
/// neither nodes nor edges, and never influences junction detection.
pub trait AcceptFilter {
    fn accept(&self, road: &Road) -> bool;
}

/// The default filter: everything participates.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl AcceptFilter for AcceptAll {
    fn accept(&self, _road: &Road) -> bool {
        true
    }
}

impl<F> AcceptFilter for F
where
    F: Fn(&Road) -> bool,
{
    fn accept(&self, road: &Road) -> bool {
        self(road)
    }
}

/// Vec-backed source for tests and embedding. Replays its roads in
/// insertion order on every traversal.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    roads: Vec<Road>,
}

impl MemorySource {
    pub fn new(roads: Vec<Road>) -> Self {
        MemorySource { roads }
    }

    pub fn push(&mut self, road: Road) {
        self.roads.push(road);
    }

    pub fn len(&self) -> usize {
        self.roads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }
}

impl FeatureSource for MemorySource {
    type Iter = std::vec::IntoIter<Result<Road>>;

    fn open(&self) -> Result<Self::Iter> {
        let items: Vec<Result<Road>> = self.roads.iter().cloned().map(Ok).collect();
        Ok(items.into_iter())
    }

    fn describe(&self) -> String {
        format!("memory source ({} roads)", self.roads.len())
    }
}
