//! JSON materialization
//!
//! `to_json` renders a proxy and everything reachable from it as nested JSON.
//! Subjects are tracked by identity for the duration of one call; a subject
//! reached again renders as `{"@id": ...}`, which is what keeps cyclic data
//! finite. `assign_json` goes the other way, writing nested JSON in a single
//! transaction.

use super::context::ValueKind;
use super::object::{Item, LdoProxy, Property, Value};
use super::{from_json_typed, ProxyError, ProxyResult};
use crate::rdf::{BlankNode, RdfSubject};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;
use tracing::debug;

impl LdoProxy {
    /// Render this subject and everything reachable from it
    pub fn to_json(&self) -> ProxyResult<JsonValue> {
        let mut seen = HashSet::new();
        let value = self.materialize(&mut seen)?;
        debug!("Materialized {} subjects from {}", seen.len(), self.subject);
        Ok(value)
    }

    fn materialize(&self, seen: &mut HashSet<RdfSubject>) -> ProxyResult<JsonValue> {
        let id = self.id();
        if !seen.insert(self.subject.clone()) {
            return Ok(json!({ "@id": id }));
        }

        let mut object = Map::new();
        object.insert("@id".to_string(), JsonValue::String(id));
        for alias in self.aliases() {
            let value = match self.get(&alias)? {
                Property::Single(None) => continue,
                Property::Single(Some(item)) => item_json(item, seen)?,
                Property::Set(set) => {
                    let items = set.items()?;
                    if items.is_empty() {
                        continue;
                    }
                    items_json(items, seen)?
                }
                Property::List(list) => items_json(list.items()?, seen)?,
            };
            object.insert(alias, value);
        }
        Ok(JsonValue::Object(object))
    }

    /// Write every key of a JSON object; `null` deletes the property.
    ///
    /// Nested objects become subjects of their own (their `@id`, or a fresh
    /// blank node) viewed through the property's shape. Either every key is
    /// written or, on error, none is.
    pub fn assign_json(&self, json: &JsonValue) -> ProxyResult<()> {
        self.scope
            .store
            .transaction(|_| self.assign_object(json))?;
        Ok(())
    }

    fn assign_object(&self, json: &JsonValue) -> ProxyResult<()> {
        let map = json.as_object().ok_or_else(|| ProxyError::ShapeMismatch {
            alias: self.id(),
            reason: format!("expected a JSON object, found {}", json),
        })?;

        for (alias, value) in map {
            if alias == "@id" {
                continue;
            }
            if value.is_null() {
                self.delete(alias)?;
                continue;
            }
            let values = match value {
                JsonValue::Array(items) => items
                    .iter()
                    .map(|item| self.json_to_value(alias, item))
                    .collect::<ProxyResult<Vec<_>>>()?,
                other => vec![self.json_to_value(alias, other)?],
            };
            self.set_many(alias, values)?;
        }
        Ok(())
    }

    fn json_to_value(&self, alias: &str, json: &JsonValue) -> ProxyResult<Value> {
        let slot = self.slot(alias)?;
        match slot.entry.kind {
            ValueKind::Literal => from_json_typed(json, slot.entry.datatype.as_ref())
                .map(Value::Literal)
                .ok_or_else(|| slot.mismatch(format!("cannot store {} as a literal", json))),
            ValueKind::Object => match json {
                JsonValue::String(id) => Ok(Value::Node(RdfSubject::parse(id)?)),
                JsonValue::Object(map) => {
                    let subject = match map.get("@id").and_then(JsonValue::as_str) {
                        Some(id) => RdfSubject::parse(id)?,
                        None => BlankNode::new().into(),
                    };
                    let child = LdoProxy::new(self.scope.clone(), subject.clone(), slot.entry.shape.clone());
                    child.assign_object(json)?;
                    Ok(Value::Node(subject))
                }
                other => Err(slot.mismatch(format!("cannot store {} as a node", other))),
            },
        }
    }
}

fn item_json(item: Item, seen: &mut HashSet<RdfSubject>) -> ProxyResult<JsonValue> {
    match item {
        Item::Literal(value) => Ok(value.to_json()),
        Item::Object(proxy) => proxy.materialize(seen),
    }
}

fn items_json(items: Vec<Item>, seen: &mut HashSet<RdfSubject>) -> ProxyResult<JsonValue> {
    items
        .into_iter()
        .map(|item| item_json(item, seen))
        .collect::<ProxyResult<Vec<_>>>()
        .map(JsonValue::Array)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyOptions;
    use crate::proxy::{Cardinality, ContextEntry, LdoContext, ProxyEngine, ShapeContext};
    use crate::rdf::{NamedNode, RdfPredicate, SubscribableStore};
    use crate::rdf::namespace::xsd;
    use std::cell::Cell;
    use std::rc::Rc;

    fn pred(local: &str) -> RdfPredicate {
        RdfPredicate::new(&format!("http://example.org/{}", local)).unwrap()
    }

    fn engine() -> ProxyEngine {
        let mut person = ShapeContext::new();
        person.insert("name", ContextEntry::literal(pred("name")));
        person.insert(
            "age",
            ContextEntry::literal(pred("age")).with_datatype(xsd::INTEGER.into()),
        );
        person.insert(
            "knows",
            ContextEntry::object(pred("knows"))
                .with_shape("Person")
                .with_cardinality(Cardinality::Set),
        );
        let mut context = LdoContext::new();
        context.insert_shape("Person", person);
        ProxyEngine::new(SubscribableStore::new(), context, ProxyOptions::default()).unwrap()
    }

    #[test]
    fn test_cyclic_graph_materializes_finitely() {
        let engine = engine();
        let alice = engine
            .from_json(
                "Person",
                &json!({
                    "@id": "http://example.org/alice",
                    "name": "Alice",
                    "knows": [{
                        "@id": "http://example.org/bob",
                        "name": "Bob",
                        "knows": ["http://example.org/alice"]
                    }]
                }),
            )
            .unwrap();

        let rendered = alice.to_json().unwrap();
        assert_eq!(
            rendered,
            json!({
                "@id": "http://example.org/alice",
                "name": "Alice",
                "knows": [{
                    "@id": "http://example.org/bob",
                    "name": "Bob",
                    "knows": [{ "@id": "http://example.org/alice" }]
                }]
            })
        );
    }

    #[test]
    fn test_assign_is_one_notification() {
        let engine = engine();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let _handle = engine
            .store()
            .subscribe(crate::rdf::QuadPattern::any(), move |_| counter.set(counter.get() + 1));

        let proxy = engine
            .from_subject("Person", NamedNode::new("http://example.org/carol").unwrap())
            .unwrap();
        proxy
            .assign_json(&json!({"name": "Carol", "age": 41, "knows": [{"name": "Dan"}]}))
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(engine.store().len(), 4);
    }

    #[test]
    fn test_failed_assign_rolls_back() {
        let engine = engine();
        let proxy = engine
            .from_subject("Person", NamedNode::new("http://example.org/erin").unwrap())
            .unwrap();
        let result = proxy.assign_json(&json!({"name": "Erin", "knows": [42]}));
        assert!(matches!(result, Err(ProxyError::ShapeMismatch { .. })));
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_null_deletes() {
        let engine = engine();
        let proxy = engine
            .from_json("Person", &json!({"@id": "http://example.org/f", "name": "F", "age": 3}))
            .unwrap();
        proxy.assign_json(&json!({"age": null})).unwrap();
        assert_eq!(
            proxy.to_json().unwrap(),
            json!({"@id": "http://example.org/f", "name": "F"})
        );
    }
}
