//! Live set views
//!
//! An `LdSet` holds only coordinates. Membership is whatever the store
//! matches at the moment of the call, so two sets over the same property
//! always agree.

use super::object::{Item, Slot, Value};
use super::{ProxyError, ProxyResult};
use std::fmt;

/// Unordered values of one property of one subject
#[derive(Clone)]
pub struct LdSet {
    slot: Slot,
}

impl LdSet {
    pub(crate) fn new(slot: Slot) -> Self {
        Self { slot }
    }

    /// Alias the set was read through
    pub fn alias(&self) -> &str {
        &self.slot.alias
    }

    /// Add a value; returns false if it was already present
    pub fn add(&self, value: impl Into<Value>) -> ProxyResult<bool> {
        let term = self.slot.encode(&value.into())?;
        if self.slot.terms().contains(&term) {
            return Ok(false);
        }
        self.slot.scope.store.add(self.slot.quad_for(term)?);
        Ok(true)
    }

    /// Remove a value from every graph in scope; returns false if absent
    pub fn delete(&self, value: impl Into<Value>) -> ProxyResult<bool> {
        let term = self.slot.encode(&value.into())?;
        let doomed: Vec<_> = self
            .slot
            .quads()
            .into_iter()
            .filter(|q| self.slot.term_of(q) == term)
            .collect();
        if doomed.is_empty() {
            return Ok(false);
        }
        self.slot.scope.store.transaction(|store| {
            for quad in &doomed {
                store.delete(quad);
            }
            Ok::<_, ProxyError>(())
        })?;
        Ok(true)
    }

    pub fn has(&self, value: impl Into<Value>) -> ProxyResult<bool> {
        let term = self.slot.encode(&value.into())?;
        Ok(self.slot.terms().contains(&term))
    }

    pub fn len(&self) -> usize {
        self.slot.terms().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current members, decoded
    pub fn items(&self) -> ProxyResult<Vec<Item>> {
        self.slot
            .terms()
            .into_iter()
            .map(|term| self.slot.decode(term))
            .collect()
    }

    /// Current members as writable values
    pub fn values(&self) -> ProxyResult<Vec<Value>> {
        Ok(self.items()?.iter().map(Item::to_value).collect())
    }

    /// Remove every member
    pub fn clear(&self) -> ProxyResult<()> {
        self.slot.replace(Vec::new())
    }
}

impl fmt::Debug for LdSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdSet")
            .field("subject", &self.slot.subject)
            .field("predicate", &self.slot.entry.predicate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyOptions;
    use crate::proxy::{
        Cardinality, ContextEntry, LdoContext, NativeValue, ProxyEngine, ShapeContext,
    };
    use crate::rdf::{NamedNode, QuadPattern, RdfPredicate, SubscribableStore};

    fn engine() -> ProxyEngine {
        let mut shape = ShapeContext::new();
        shape.insert(
            "tags",
            ContextEntry::literal(RdfPredicate::new("http://example.org/tag").unwrap())
                .with_cardinality(Cardinality::Set),
        );
        shape.insert(
            "links",
            ContextEntry::object(RdfPredicate::new("http://example.org/link").unwrap())
                .with_cardinality(Cardinality::Set),
        );
        let mut context = LdoContext::new();
        context.insert_shape("Doc", shape);
        ProxyEngine::new(SubscribableStore::new(), context, ProxyOptions::default()).unwrap()
    }

    fn doc() -> NamedNode {
        NamedNode::new("http://example.org/doc").unwrap()
    }

    #[test]
    fn test_add_is_idempotent() {
        let engine = engine();
        let tags = engine.from_subject("Doc", doc()).unwrap().set_of("tags").unwrap();
        assert!(tags.add("rust").unwrap());
        assert!(!tags.add("rust").unwrap());
        assert_eq!(tags.len(), 1);
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_add_then_delete_restores() {
        let engine = engine();
        let proxy = engine.from_subject("Doc", doc()).unwrap();
        let tags = proxy.set_of("tags").unwrap();
        tags.add("a").unwrap();
        let before = engine.store().snapshot();

        tags.add("b").unwrap();
        assert!(tags.delete("b").unwrap());
        assert_eq!(engine.store().snapshot(), before);
        assert!(!tags.delete("b").unwrap());
    }

    #[test]
    fn test_views_share_state() {
        let engine = engine();
        let proxy = engine.from_subject("Doc", doc()).unwrap();
        let first = proxy.set_of("links").unwrap();
        let second = proxy.set_of("links").unwrap();

        let target = NamedNode::new("http://example.org/other").unwrap();
        first.add(target.clone()).unwrap();
        assert!(second.has(target.clone()).unwrap());
        second.clear().unwrap();
        assert!(first.is_empty());
    }

    #[test]
    fn test_items_and_values() {
        let engine = engine();
        let proxy = engine.from_subject("Doc", doc()).unwrap();
        proxy
            .set_many("tags", vec![Value::from("x"), Value::from("y")])
            .unwrap();

        let tags = proxy.set_of("tags").unwrap();
        let mut items: Vec<String> = tags
            .items()
            .unwrap()
            .iter()
            .filter_map(|i| i.as_literal().and_then(NativeValue::as_str).map(str::to_string))
            .collect();
        items.sort();
        assert_eq!(items, vec!["x", "y"]);
        assert_eq!(tags.values().unwrap().len(), 2);

        let links = proxy.set_of("links").unwrap();
        links.add(NamedNode::new("http://example.org/a").unwrap()).unwrap();
        let item = links.items().unwrap().pop().unwrap();
        assert_eq!(item.as_object().unwrap().id(), "http://example.org/a");
    }

    #[test]
    fn test_kind_checked() {
        let engine = engine();
        let links = engine.from_subject("Doc", doc()).unwrap().set_of("links").unwrap();
        assert!(matches!(
            links.add("plain text"),
            Err(ProxyError::ShapeMismatch { .. })
        ));
        assert!(engine
            .store()
            .match_quads(&QuadPattern::any())
            .is_empty());
    }
}
