//! In-memory quad store
//!
//! Set-semantics storage for quads with subject and object indices. Adding a
//! quad that is already present, or deleting one that is absent, is a no-op.

use super::changes::DatasetChanges;
use super::types::{Quad, QuadPattern, RdfGraph, RdfObject, RdfSubject};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::collections::HashSet;

/// The dataset contract shared by every store in this crate
///
/// Mutations never fail: adding a present quad or deleting an absent one does
/// nothing. `match_quads` returns a materialized snapshot, so callers may
/// mutate the dataset while consuming the result.
pub trait Dataset {
    /// Add a quad
    fn add(&mut self, quad: Quad);

    /// Delete a quad
    fn delete(&mut self, quad: &Quad);

    /// All quads matching a pattern, snapshotted at call time
    fn match_quads(&self, pattern: &QuadPattern) -> Vec<Quad>;

    /// Check whether a quad is present
    fn has(&self, quad: &Quad) -> bool;

    /// Number of quads
    fn size(&self) -> usize;

    /// Every quad in the dataset
    fn quads(&self) -> Vec<Quad> {
        self.match_quads(&QuadPattern::any())
    }

    /// Set equality, independent of insertion order
    fn equals(&self, other: &dyn Dataset) -> bool {
        self.size() == other.size() && other.quads().iter().all(|quad| self.has(quad))
    }
}

/// Quad store with subject and object indices
///
/// - quads: primary storage, iteration follows insertion order
/// - subject_index: Subject -> quads with that subject
/// - object_index: Object -> quads with that object (inverse lookups)
#[derive(Debug, Clone, Default)]
pub struct QuadStore {
    /// All quads (primary storage)
    quads: IndexSet<Quad>,

    /// Subject index
    subject_index: FxHashMap<RdfSubject, IndexSet<Quad>>,

    /// Object index
    object_index: FxHashMap<RdfObject, IndexSet<Quad>>,
}

impl QuadStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given quads (duplicates collapse)
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        let mut store = Self::new();
        store.extend(quads);
        store
    }

    /// Insert a quad, returning whether it was newly added
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.quads.contains(&quad) {
            return false;
        }

        self.subject_index
            .entry(quad.subject.clone())
            .or_default()
            .insert(quad.clone());
        self.object_index
            .entry(quad.object.clone())
            .or_default()
            .insert(quad.clone());
        self.quads.insert(quad);
        true
    }

    /// Remove a quad, returning whether it was present
    pub fn remove(&mut self, quad: &Quad) -> bool {
        if !self.quads.shift_remove(quad) {
            return false;
        }

        if let Some(quads) = self.subject_index.get_mut(&quad.subject) {
            quads.shift_remove(quad);
            if quads.is_empty() {
                self.subject_index.remove(&quad.subject);
            }
        }
        if let Some(quads) = self.object_index.get_mut(&quad.object) {
            quads.shift_remove(quad);
            if quads.is_empty() {
                self.object_index.remove(&quad.object);
            }
        }
        true
    }

    /// Insert every quad from an iterator
    pub fn extend(&mut self, quads: impl IntoIterator<Item = Quad>) {
        for quad in quads {
            self.insert(quad);
        }
    }

    /// Check if a quad exists in the store
    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    /// Get the total number of quads
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Clear all quads
    pub fn clear(&mut self) {
        self.quads.clear();
        self.subject_index.clear();
        self.object_index.clear();
    }

    /// Iterate over all quads in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// Query quads matching a pattern, using the most selective index available
    pub fn query(&self, pattern: &QuadPattern) -> Vec<Quad> {
        let candidates: Box<dyn Iterator<Item = &Quad> + '_> = if let Some(subject) = &pattern.subject {
            match self.subject_index.get(subject) {
                Some(quads) => Box::new(quads.iter()),
                None => return Vec::new(),
            }
        } else if let Some(object) = &pattern.object {
            match self.object_index.get(object) {
                Some(quads) => Box::new(quads.iter()),
                None => return Vec::new(),
            }
        } else {
            Box::new(self.quads.iter())
        };

        candidates
            .filter(|quad| pattern.matches(quad))
            .cloned()
            .collect()
    }

    /// Distinct graphs present in the store
    pub fn graphs(&self) -> Vec<RdfGraph> {
        let mut seen = HashSet::new();
        self.quads
            .iter()
            .filter(|quad| seen.insert(&quad.graph))
            .map(|quad| quad.graph.clone())
            .collect()
    }

    /// Distinct subjects present in the store
    pub fn subjects(&self) -> Vec<RdfSubject> {
        self.subject_index.keys().cloned().collect()
    }

    /// Apply a change set (removals first, then additions) and return the
    /// net effective change: quads that were already absent or present are
    /// dropped, and a quad removed then re-added cancels out.
    pub fn apply(&mut self, changes: &DatasetChanges) -> DatasetChanges {
        let mut effective = DatasetChanges::default();
        for quad in changes.removed.iter() {
            if self.remove(quad) {
                effective.record_removed(quad.clone());
            }
        }
        for quad in changes.added.iter() {
            if self.insert(quad.clone()) {
                effective.record_added(quad.clone());
            }
        }
        effective
    }
}

impl Dataset for QuadStore {
    fn add(&mut self, quad: Quad) {
        self.insert(quad);
    }

    fn delete(&mut self, quad: &Quad) {
        self.remove(quad);
    }

    fn match_quads(&self, pattern: &QuadPattern) -> Vec<Quad> {
        self.query(pattern)
    }

    fn has(&self, quad: &Quad) -> bool {
        self.contains(quad)
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl PartialEq for QuadStore {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && other.iter().all(|quad| self.contains(quad))
    }
}

impl Eq for QuadStore {}

impl FromIterator<Quad> for QuadStore {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        Self::from_quads(iter)
    }
}

impl<'a> IntoIterator for &'a QuadStore {
    type Item = &'a Quad;
    type IntoIter = indexmap::set::Iter<'a, Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::{Literal, NamedNode, RdfPredicate};

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(&format!("http://example.org/{}", s)).unwrap()
    }

    fn pred(s: &str) -> RdfPredicate {
        RdfPredicate::from(iri(s))
    }

    fn create_test_quad() -> Quad {
        Quad::in_default_graph(iri("alice"), pred("name"), Literal::new_simple_literal("Alice"))
    }

    #[test]
    fn test_insert_and_contains() {
        let mut store = QuadStore::new();
        let quad = create_test_quad();

        assert!(store.insert(quad.clone()));
        assert_eq!(store.len(), 1);
        assert!(store.contains(&quad));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut store = QuadStore::new();
        let quad = create_test_quad();

        store.add(quad.clone());
        let before = store.match_quads(&QuadPattern::any());
        store.add(quad);
        assert_eq!(store.size(), 1);
        assert_eq!(store.match_quads(&QuadPattern::any()), before);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut store = QuadStore::new();
        store.add(create_test_quad());

        let other = Quad::in_default_graph(iri("bob"), pred("name"), Literal::new_simple_literal("Bob"));
        store.delete(&other);
        assert_eq!(store.size(), 1);
        assert!(!store.remove(&other));
    }

    #[test]
    fn test_remove_cleans_indices() {
        let mut store = QuadStore::new();
        let quad = create_test_quad();

        store.insert(quad.clone());
        assert!(store.remove(&quad));
        assert!(store.is_empty());
        assert!(store.subjects().is_empty());
        assert!(store
            .query(&QuadPattern::any().object(Literal::new_simple_literal("Alice")))
            .is_empty());
    }

    #[test]
    fn test_match_with_wildcards() {
        let mut store = QuadStore::new();
        let g = iri("g");
        store.insert(create_test_quad());
        store.insert(Quad::in_default_graph(iri("alice"), pred("knows"), iri("bob")));
        store.insert(Quad::new(iri("bob"), pred("knows"), iri("alice"), g.clone()));

        assert_eq!(store.query(&QuadPattern::any()).len(), 3);
        assert_eq!(store.query(&QuadPattern::any().subject(iri("alice"))).len(), 2);
        assert_eq!(store.query(&QuadPattern::any().predicate(pred("knows"))).len(), 2);
        assert_eq!(store.query(&QuadPattern::any().object(iri("alice"))).len(), 1);
        assert_eq!(store.query(&QuadPattern::any().graph(g)).len(), 1);
        assert_eq!(
            store
                .query(&QuadPattern::any().graph(RdfGraph::DefaultGraph))
                .len(),
            2
        );
        assert!(store.query(&QuadPattern::any().subject(iri("carol"))).is_empty());
    }

    #[test]
    fn test_match_is_a_snapshot() {
        let mut store = QuadStore::new();
        for i in 0..5 {
            store.insert(Quad::in_default_graph(
                iri("alice"),
                pred("n"),
                Literal::new_simple_literal(i.to_string()),
            ));
        }

        for quad in store.query(&QuadPattern::any().subject(iri("alice"))) {
            store.remove(&quad);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_equality_ignores_order() {
        let q1 = create_test_quad();
        let q2 = Quad::in_default_graph(iri("alice"), pred("knows"), iri("bob"));

        let a = QuadStore::from_quads(vec![q1.clone(), q2.clone()]);
        let b = QuadStore::from_quads(vec![q2, q1.clone()]);
        let c = QuadStore::from_quads(vec![q1]);

        assert_eq!(a, b);
        assert!(a.equals(&b));
        assert_ne!(a, c);
        assert!(!a.equals(&c));
    }

    #[test]
    fn test_graphs() {
        let mut store = QuadStore::new();
        store.insert(create_test_quad());
        store.insert(Quad::new(iri("a"), pred("p"), iri("b"), iri("g1")));
        store.insert(Quad::new(iri("c"), pred("p"), iri("d"), iri("g1")));

        let graphs = store.graphs();
        assert_eq!(graphs.len(), 2);
        assert!(graphs.contains(&RdfGraph::DefaultGraph));
    }

    #[test]
    fn test_apply_reports_net_changes() {
        let mut store = QuadStore::new();
        let kept = create_test_quad();
        let gone = Quad::in_default_graph(iri("alice"), pred("age"), Literal::new_simple_literal("30"));
        let new = Quad::in_default_graph(iri("alice"), pred("age"), Literal::new_simple_literal("31"));
        store.extend(vec![kept.clone(), gone.clone()]);

        let mut changes = DatasetChanges::default();
        changes.removed.insert(kept.clone());
        changes.removed.insert(gone.clone());
        changes.added.insert(kept.clone());
        changes.added.insert(new.clone());

        let effective = store.apply(&changes);
        assert_eq!(effective.added, QuadStore::from_quads(vec![new]));
        assert_eq!(effective.removed, QuadStore::from_quads(vec![gone]));
        assert!(store.contains(&kept));
    }
}
