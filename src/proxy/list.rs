//! Live RDF list views
//!
//! A list property points at the head of an `rdf:first`/`rdf:rest` chain
//! ending in `rdf:nil`. Reads walk the chain on every call. Structural edits
//! compute the new value sequence and rewrite the whole chain with fresh
//! blank nodes in one transaction, so the store never holds a half-edited
//! chain.

use super::object::{Item, Slot, Value};
use super::{ProxyError, ProxyResult};
use crate::rdf::namespace::rdf;
use crate::rdf::{BlankNode, Quad, QuadPattern, RdfObject, RdfPredicate, RdfSubject};
use indexmap::IndexSet;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Decoded chain: the head pointer quads, the list nodes and their values
struct Chain {
    heads: Vec<Quad>,
    nodes: Vec<RdfSubject>,
    values: Vec<RdfObject>,
}

/// Ordered values of one property of one subject
#[derive(Clone)]
pub struct LdList {
    slot: Slot,
}

impl LdList {
    pub(crate) fn new(slot: Slot) -> Self {
        Self { slot }
    }

    /// Alias the list was read through
    pub fn alias(&self) -> &str {
        &self.slot.alias
    }

    fn link_pattern(&self, node: &RdfSubject, predicate: RdfPredicate) -> QuadPattern {
        let pattern = QuadPattern::any().subject(node.clone()).predicate(predicate);
        match &self.slot.scope.read_graph {
            Some(graph) => pattern.graph(graph.clone()),
            None => pattern,
        }
    }

    fn link_quads(&self, node: &RdfSubject, predicate: RdfPredicate) -> Vec<Quad> {
        self.slot
            .scope
            .store
            .match_quads(&self.link_pattern(node, predicate))
    }

    /// The single object of `node`'s `predicate` link
    fn link(&self, node: &RdfSubject, predicate: RdfPredicate) -> ProxyResult<RdfObject> {
        let mut objects: IndexSet<RdfObject> = self
            .link_quads(node, predicate.clone())
            .into_iter()
            .map(|q| q.object)
            .collect();
        match objects.len() {
            1 => objects
                .pop()
                .ok_or_else(|| ProxyError::MalformedList(format!("{} lost {}", node, predicate))),
            0 => Err(ProxyError::MalformedList(format!(
                "{} has no {}",
                node, predicate
            ))),
            n => Err(ProxyError::MalformedList(format!(
                "{} has {} {} links",
                node, n, predicate
            ))),
        }
    }

    fn chain(&self) -> ProxyResult<Chain> {
        let heads = self.slot.quads();
        let mut starts: IndexSet<RdfObject> = heads.iter().map(|q| self.slot.term_of(q)).collect();
        if starts.len() > 1 {
            return Err(ProxyError::MalformedList(format!(
                "{} of {} has {} list heads",
                self.slot.alias,
                self.slot.subject,
                starts.len()
            )));
        }

        let mut chain = Chain {
            heads,
            nodes: Vec::new(),
            values: Vec::new(),
        };
        let mut cursor = match starts.pop() {
            None => return Ok(chain),
            Some(start) => list_node(start)?,
        };
        let nil = RdfSubject::NamedNode(rdf::NIL.into());
        let mut seen = HashSet::new();
        while cursor != nil {
            if !seen.insert(cursor.clone()) {
                return Err(ProxyError::MalformedList(format!("cycle through {}", cursor)));
            }
            let first = self.link(&cursor, rdf::FIRST.into())?;
            let rest = self.link(&cursor, rdf::REST.into())?;
            chain.nodes.push(cursor);
            chain.values.push(first);
            cursor = list_node(rest)?;
        }
        Ok(chain)
    }

    /// Rewrite the chain so it holds exactly `values`
    fn rebuild(&self, values: Vec<RdfObject>) -> ProxyResult<()> {
        let chain = self.chain()?;
        let mut old = chain.heads;
        for node in &chain.nodes {
            old.extend(self.link_quads(node, rdf::FIRST.into()));
            old.extend(self.link_quads(node, rdf::REST.into()));
        }

        let graph = &self.slot.scope.write_graph;
        let nodes: Vec<BlankNode> = values.iter().map(|_| BlankNode::new()).collect();
        let nil: RdfObject = rdf::NIL.into();
        let head = nodes
            .first()
            .map(|n| RdfObject::from(n.clone()))
            .unwrap_or_else(|| nil.clone());

        let mut new = Vec::with_capacity(1 + 2 * nodes.len());
        new.push(self.slot.quad_for(head)?);
        for (i, (node, value)) in nodes.iter().zip(values).enumerate() {
            let rest = nodes
                .get(i + 1)
                .map(|n| RdfObject::from(n.clone()))
                .unwrap_or_else(|| nil.clone());
            new.push(Quad::new(node.clone(), rdf::FIRST, value, graph.clone()));
            new.push(Quad::new(node.clone(), rdf::REST, rest, graph.clone()));
        }

        debug!(
            "Rebuilding list {} of {} with {} items",
            self.slot.alias,
            self.slot.subject,
            nodes.len()
        );
        self.slot.scope.store.transaction(|store| {
            for quad in &old {
                store.delete(quad);
            }
            for quad in new {
                store.add(quad);
            }
            Ok::<_, ProxyError>(())
        })?;
        Ok(())
    }

    /// Remove the head pointer and the whole chain
    pub(crate) fn detach(&self) -> ProxyResult<()> {
        let chain = self.chain()?;
        let mut old = chain.heads;
        for node in &chain.nodes {
            old.extend(self.link_quads(node, rdf::FIRST.into()));
            old.extend(self.link_quads(node, rdf::REST.into()));
        }
        self.slot.scope.store.transaction(|store| {
            for quad in &old {
                store.delete(quad);
            }
            Ok::<_, ProxyError>(())
        })?;
        Ok(())
    }

    fn terms(&self) -> ProxyResult<Vec<RdfObject>> {
        Ok(self.chain()?.values)
    }

    fn encode_all(&self, values: impl IntoIterator<Item = Value>) -> ProxyResult<Vec<RdfObject>> {
        values.into_iter().map(|v| self.slot.encode(&v)).collect()
    }

    pub fn len(&self) -> ProxyResult<usize> {
        Ok(self.terms()?.len())
    }

    pub fn is_empty(&self) -> ProxyResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, index: usize) -> ProxyResult<Option<Item>> {
        self.terms()?
            .into_iter()
            .nth(index)
            .map(|term| self.slot.decode(term))
            .transpose()
    }

    /// Values in list order
    pub fn items(&self) -> ProxyResult<Vec<Item>> {
        self.terms()?
            .into_iter()
            .map(|term| self.slot.decode(term))
            .collect()
    }

    pub fn values(&self) -> ProxyResult<Vec<Value>> {
        Ok(self.items()?.iter().map(Item::to_value).collect())
    }

    pub fn push(&self, value: impl Into<Value>) -> ProxyResult<()> {
        let mut terms = self.terms()?;
        terms.push(self.slot.encode(&value.into())?);
        self.rebuild(terms)
    }

    pub fn insert_at(&self, index: usize, value: impl Into<Value>) -> ProxyResult<()> {
        let mut terms = self.terms()?;
        if index > terms.len() {
            return Err(ProxyError::IndexOutOfBounds {
                index,
                len: terms.len(),
            });
        }
        terms.insert(index, self.slot.encode(&value.into())?);
        self.rebuild(terms)
    }

    /// Remove and return the value at `index`
    pub fn remove_at(&self, index: usize) -> ProxyResult<Item> {
        let mut terms = self.terms()?;
        if index >= terms.len() {
            return Err(ProxyError::IndexOutOfBounds {
                index,
                len: terms.len(),
            });
        }
        let removed = terms.remove(index);
        let item = self.slot.decode(removed)?;
        self.rebuild(terms)?;
        Ok(item)
    }

    pub fn set_at(&self, index: usize, value: impl Into<Value>) -> ProxyResult<()> {
        let mut terms = self.terms()?;
        let len = terms.len();
        let term = self.slot.encode(&value.into())?;
        match terms.get_mut(index) {
            Some(slot) => *slot = term,
            None => return Err(ProxyError::IndexOutOfBounds { index, len }),
        }
        self.rebuild(terms)
    }

    /// Empty the list, leaving the property pointing at `rdf:nil`
    pub fn clear(&self) -> ProxyResult<()> {
        self.rebuild(Vec::new())
    }

    pub fn replace_all(&self, values: impl IntoIterator<Item = Value>) -> ProxyResult<()> {
        let terms = self.encode_all(values)?;
        self.rebuild(terms)
    }
}

/// A chain position must be a node
fn list_node(term: RdfObject) -> ProxyResult<RdfSubject> {
    RdfSubject::try_from(term)
        .map_err(|e| ProxyError::MalformedList(format!("literal in node position: {}", e)))
}

impl fmt::Debug for LdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdList")
            .field("subject", &self.slot.subject)
            .field("predicate", &self.slot.entry.predicate)
            .finish()
    }
}
