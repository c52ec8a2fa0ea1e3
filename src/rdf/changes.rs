//! Dataset change sets
//!
//! `DatasetChanges` is the added/removed pair handed to sync collaborators.
//! `ChangeManager` computes, groups, applies and inverts change sets; it holds
//! no state between calls.

use super::store::{Dataset, QuadStore};
use super::types::{Quad, QuadPattern, RdfGraph};
use indexmap::IndexMap;

/// Quads added and removed between two dataset states
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetChanges {
    /// Quads present after but not before
    pub added: QuadStore,
    /// Quads present before but not after
    pub removed: QuadStore,
}

impl DatasetChanges {
    /// Create an empty change set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a change set from explicit lists
    pub fn from_parts(
        added: impl IntoIterator<Item = Quad>,
        removed: impl IntoIterator<Item = Quad>,
    ) -> Self {
        Self {
            added: QuadStore::from_quads(added),
            removed: QuadStore::from_quads(removed),
        }
    }

    /// True when nothing was added or removed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of quads touched
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }

    /// Record an addition; cancels a pending removal of the same quad
    pub fn record_added(&mut self, quad: Quad) {
        if !self.removed.remove(&quad) {
            self.added.insert(quad);
        }
    }

    /// Record a removal; cancels a pending addition of the same quad
    pub fn record_removed(&mut self, quad: Quad) {
        if !self.added.remove(&quad) {
            self.removed.insert(quad);
        }
    }

    /// Fold a later change set into this one
    pub fn merge(&mut self, later: &DatasetChanges) {
        for quad in later.removed.iter() {
            self.record_removed(quad.clone());
        }
        for quad in later.added.iter() {
            self.record_added(quad.clone());
        }
    }

    /// The part of this change set matching a pattern
    pub fn restrict(&self, pattern: &QuadPattern) -> DatasetChanges {
        DatasetChanges {
            added: self.added.query(pattern).into_iter().collect(),
            removed: self.removed.query(pattern).into_iter().collect(),
        }
    }
}

/// Stateless change computation
pub struct ChangeManager;

impl ChangeManager {
    /// `added = after − before`, `removed = before − after`
    pub fn diff(before: &dyn Dataset, after: &dyn Dataset) -> DatasetChanges {
        let added = after
            .quads()
            .into_iter()
            .filter(|quad| !before.has(quad))
            .collect();
        let removed = before
            .quads()
            .into_iter()
            .filter(|quad| !after.has(quad))
            .collect();
        DatasetChanges { added, removed }
    }

    /// Partition a change set by graph; the default graph is its own bucket.
    /// Buckets appear in first-seen order, additions before removals.
    pub fn group_by_graph(changes: &DatasetChanges) -> IndexMap<RdfGraph, DatasetChanges> {
        let mut buckets: IndexMap<RdfGraph, DatasetChanges> = IndexMap::new();
        for quad in changes.added.iter() {
            buckets
                .entry(quad.graph.clone())
                .or_default()
                .added
                .insert(quad.clone());
        }
        for quad in changes.removed.iter() {
            buckets
                .entry(quad.graph.clone())
                .or_default()
                .removed
                .insert(quad.clone());
        }
        buckets
    }

    /// Apply a change set to any dataset, removals first
    pub fn apply<D: Dataset + ?Sized>(dataset: &mut D, changes: &DatasetChanges) {
        for quad in changes.removed.iter() {
            dataset.delete(quad);
        }
        for quad in changes.added.iter() {
            dataset.add(quad.clone());
        }
    }

    /// The change set that undoes `changes`
    pub fn invert(changes: &DatasetChanges) -> DatasetChanges {
        DatasetChanges {
            added: changes.removed.clone(),
            removed: changes.added.clone(),
        }
    }
}
