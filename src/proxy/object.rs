//! Object proxies
//!
//! `LdoProxy` reads and writes the properties of one subject. Each access
//! resolves the alias to a `Slot`: the subject, the resolved entry and the
//! graph scope, which is all the set, list and single-value logic needs.

use super::coerce::{check_native, datatype_accepts, from_native, to_native, NativeValue};
use super::context::{Cardinality, ContextEntry, LdoContext, ValueKind};
use super::list::LdList;
use super::set::LdSet;
use super::{ProxyError, ProxyResult, Scope};
use crate::config::{LANGUAGE_NONE, LANGUAGE_OTHER};
use crate::rdf::{
    BlankNode, NamedNode, Quad, QuadPattern, RdfGraph, RdfObject, RdfSubject, SubscribableStore,
};
use crate::rdf::namespace::xsd;
use indexmap::IndexSet;
use std::fmt;

/// A value to write
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(NativeValue),
    Node(RdfSubject),
}

macro_rules! literal_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Literal(value.into())
            }
        })*
    };
}

literal_value!(&str, String, i64, i32, f64, bool, NativeValue);

impl From<RdfSubject> for Value {
    fn from(subject: RdfSubject) -> Self {
        Value::Node(subject)
    }
}

impl From<NamedNode> for Value {
    fn from(node: NamedNode) -> Self {
        Value::Node(node.into())
    }
}

impl From<BlankNode> for Value {
    fn from(node: BlankNode) -> Self {
        Value::Node(node.into())
    }
}

impl From<&LdoProxy> for Value {
    fn from(proxy: &LdoProxy) -> Self {
        Value::Node(proxy.subject.clone())
    }
}

impl From<LdoProxy> for Value {
    fn from(proxy: LdoProxy) -> Self {
        Value::Node(proxy.subject)
    }
}

/// A value read from the store
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Literal(NativeValue),
    Object(LdoProxy),
}

impl Item {
    pub fn as_literal(&self) -> Option<&NativeValue> {
        match self {
            Item::Literal(value) => Some(value),
            Item::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&LdoProxy> {
        match self {
            Item::Object(proxy) => Some(proxy),
            Item::Literal(_) => None,
        }
    }

    /// The value that writes this item back
    pub fn to_value(&self) -> Value {
        match self {
            Item::Literal(value) => Value::Literal(value.clone()),
            Item::Object(proxy) => Value::Node(proxy.subject.clone()),
        }
    }
}

/// Result of reading an alias
#[derive(Debug, Clone)]
pub enum Property {
    Single(Option<Item>),
    Set(LdSet),
    List(LdList),
}

impl Property {
    pub fn into_item(self) -> Option<Item> {
        match self {
            Property::Single(item) => item,
            _ => None,
        }
    }

    pub fn into_set(self) -> Option<LdSet> {
        match self {
            Property::Set(set) => Some(set),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<LdList> {
        match self {
            Property::List(list) => Some(list),
            _ => None,
        }
    }
}

/// Coordinates of one property of one subject
#[derive(Clone)]
pub(crate) struct Slot {
    pub(crate) scope: Scope,
    pub(crate) subject: RdfSubject,
    pub(crate) alias: String,
    pub(crate) entry: ContextEntry,
}

impl Slot {
    pub(crate) fn mismatch(&self, reason: impl Into<String>) -> ProxyError {
        ProxyError::ShapeMismatch {
            alias: self.alias.clone(),
            reason: reason.into(),
        }
    }

    fn pattern(&self) -> QuadPattern {
        let pattern = QuadPattern::any().predicate(self.entry.predicate.clone());
        let pattern = if self.entry.inverse {
            pattern.object(self.subject.clone())
        } else {
            pattern.subject(self.subject.clone())
        };
        match &self.scope.read_graph {
            Some(graph) => pattern.graph(graph.clone()),
            None => pattern,
        }
    }

    /// Quads backing this property, filtered to the declared language
    pub(crate) fn quads(&self) -> Vec<Quad> {
        let mut quads = self.scope.store.match_quads(&self.pattern());
        if let Some(language) = &self.entry.language {
            quads.retain(|q| match &q.object {
                RdfObject::Literal(l) => l
                    .language()
                    .is_some_and(|tag| tag.eq_ignore_ascii_case(language)),
                _ => false,
            });
        }
        quads
    }

    /// The value side of a backing quad
    pub(crate) fn term_of(&self, quad: &Quad) -> RdfObject {
        if self.entry.inverse {
            quad.subject.clone().into()
        } else {
            quad.object.clone()
        }
    }

    /// Distinct values, in store order
    pub(crate) fn terms(&self) -> Vec<RdfObject> {
        self.quads()
            .iter()
            .map(|q| self.term_of(q))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect()
    }

    /// Quad stating `term` as a value of this property in the write graph
    pub(crate) fn quad_for(&self, term: RdfObject) -> ProxyResult<Quad> {
        let quad = if self.entry.inverse {
            Quad::new(
                RdfSubject::try_from(term)?,
                self.entry.predicate.clone(),
                self.subject.clone(),
                self.scope.write_graph.clone(),
            )
        } else {
            Quad::new(
                self.subject.clone(),
                self.entry.predicate.clone(),
                term,
                self.scope.write_graph.clone(),
            )
        };
        Ok(quad)
    }

    /// Read a stored term as declared by the entry
    pub(crate) fn decode(&self, term: RdfObject) -> ProxyResult<Item> {
        match (self.entry.kind, term) {
            (ValueKind::Literal, RdfObject::Literal(literal)) => {
                if let Some(declared) = &self.entry.datatype {
                    if !datatype_accepts(declared.as_str(), literal.datatype_iri()) {
                        return Err(self.mismatch(format!(
                            "expected a {} literal, found {}",
                            declared, literal
                        )));
                    }
                }
                Ok(Item::Literal(to_native(&literal, self.scope.strict_literals)?))
            }
            (ValueKind::Object, RdfObject::Literal(literal)) => {
                Err(self.mismatch(format!("expected a node, found literal {}", literal)))
            }
            (ValueKind::Literal, node) => {
                Err(self.mismatch(format!("expected a literal, found node {}", node)))
            }
            (ValueKind::Object, node) => Ok(Item::Object(LdoProxy::new(
                self.scope.clone(),
                RdfSubject::try_from(node)?,
                self.entry.shape.clone(),
            ))),
        }
    }

    /// Encode a value as declared by the entry
    pub(crate) fn encode(&self, value: &Value) -> ProxyResult<RdfObject> {
        match (self.entry.kind, value) {
            (ValueKind::Literal, Value::Literal(native)) => {
                let datatype = self.entry.datatype.as_ref();
                let language = self.entry.language.as_deref();
                check_native(native, datatype, language).map_err(|reason| self.mismatch(reason))?;
                Ok(from_native(native, datatype, language)?.into())
            }
            (ValueKind::Object, Value::Node(subject)) => Ok(subject.clone().into()),
            (ValueKind::Literal, Value::Node(subject)) => {
                Err(self.mismatch(format!("cannot store node {} as a literal", subject)))
            }
            (ValueKind::Object, Value::Literal(native)) => {
                Err(self.mismatch(format!("cannot store literal {} as a node", native)))
            }
        }
    }

    /// Remove every backing quad, then state each of `terms`
    pub(crate) fn replace(&self, terms: Vec<RdfObject>) -> ProxyResult<()> {
        let old = self.quads();
        let new = terms
            .into_iter()
            .map(|t| self.quad_for(t))
            .collect::<ProxyResult<Vec<_>>>()?;
        self.scope.store.transaction(|store| {
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

    /// Pick among language variants by the configured preference order
    fn pick_language(&self, terms: &[RdfObject]) -> Option<usize> {
        if self.entry.kind != ValueKind::Literal {
            return None;
        }
        let mut tags: Vec<Option<&str>> = Vec::with_capacity(terms.len());
        for term in terms {
            let literal = term.as_literal()?;
            let tag = literal.language();
            if tag.is_none() && literal.datatype_iri() != xsd::STRING.as_str() {
                return None;
            }
            if tags.contains(&tag) {
                return None;
            }
            tags.push(tag);
        }

        let preferences = &self.scope.languages;
        let listed = |tag: &str| {
            preferences
                .iter()
                .any(|p| p != LANGUAGE_OTHER && p.eq_ignore_ascii_case(tag))
        };
        preferences.iter().find_map(|preference| match preference.as_str() {
            LANGUAGE_NONE => tags.iter().position(Option::is_none),
            LANGUAGE_OTHER => tags.iter().position(|t| t.is_some_and(|t| !listed(t))),
            wanted => tags
                .iter()
                .position(|t| t.is_some_and(|t| t.eq_ignore_ascii_case(wanted))),
        })
    }

    pub(crate) fn read_single(&self) -> ProxyResult<Option<Item>> {
        let mut terms = self.terms();
        if terms.len() > 1 {
            match self.pick_language(&terms) {
                Some(index) => terms = vec![terms.swap_remove(index)],
                None => {
                    return Err(self.mismatch(format!(
                        "expected at most one value, found {}",
                        terms.len()
                    )))
                }
            }
        }
        terms.pop().map(|term| self.decode(term)).transpose()
    }
}

/// Live view of one subject through a shape's aliases
#[derive(Clone)]
pub struct LdoProxy {
    pub(crate) scope: Scope,
    pub(crate) subject: RdfSubject,
    pub(crate) shape: Option<String>,
}

impl LdoProxy {
    pub(crate) fn new(scope: Scope, subject: RdfSubject, shape: Option<String>) -> Self {
        Self {
            scope,
            subject,
            shape,
        }
    }

    pub fn subject(&self) -> &RdfSubject {
        &self.subject
    }

    /// IRI or `_:id` of the subject
    pub fn id(&self) -> String {
        self.subject.to_id_string()
    }

    /// Shape label; `None` means every shape's aliases apply
    pub fn shape(&self) -> Option<&str> {
        self.shape.as_deref()
    }

    pub fn store(&self) -> &SubscribableStore {
        &self.scope.store
    }

    pub fn context(&self) -> &LdoContext {
        &self.scope.context
    }

    /// Aliases readable on this proxy
    pub fn aliases(&self) -> Vec<String> {
        self.scope
            .context
            .aliases(self.shape.as_deref())
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Same subject with reads and writes limited to `graph`
    pub fn in_graph(&self, graph: impl Into<RdfGraph>) -> Self {
        Self {
            scope: self.scope.in_graph(graph.into()),
            subject: self.subject.clone(),
            shape: self.shape.clone(),
        }
    }

    /// Same subject viewed through another shape
    pub fn as_shape(&self, shape: &str) -> ProxyResult<Self> {
        self.scope.context.require_shape(shape)?;
        Ok(Self {
            scope: self.scope.clone(),
            subject: self.subject.clone(),
            shape: Some(shape.to_string()),
        })
    }

    pub(crate) fn slot(&self, alias: &str) -> ProxyResult<Slot> {
        let entry = self.scope.context.resolve(self.shape.as_deref(), alias)?;
        Ok(Slot {
            scope: self.scope.clone(),
            subject: self.subject.clone(),
            alias: alias.to_string(),
            entry: entry.clone(),
        })
    }

    /// Read a property according to its cardinality
    pub fn get(&self, alias: &str) -> ProxyResult<Property> {
        let slot = self.slot(alias)?;
        match slot.entry.cardinality {
            Cardinality::Single => Ok(Property::Single(slot.read_single()?)),
            Cardinality::Set => Ok(Property::Set(LdSet::new(slot))),
            Cardinality::List => Ok(Property::List(LdList::new(slot))),
        }
    }

    /// Read a single-valued property
    pub fn get_item(&self, alias: &str) -> ProxyResult<Option<Item>> {
        let slot = self.slot(alias)?;
        if slot.entry.cardinality != Cardinality::Single {
            return Err(slot.mismatch(format!(
                "{:?} property read as a single value",
                slot.entry.cardinality
            )));
        }
        slot.read_single()
    }

    pub fn get_literal(&self, alias: &str) -> ProxyResult<Option<NativeValue>> {
        match self.get_item(alias)? {
            Some(Item::Literal(value)) => Ok(Some(value)),
            Some(Item::Object(_)) => Err(self.slot(alias)?.mismatch("not a literal property")),
            None => Ok(None),
        }
    }

    pub fn get_object(&self, alias: &str) -> ProxyResult<Option<LdoProxy>> {
        match self.get_item(alias)? {
            Some(Item::Object(proxy)) => Ok(Some(proxy)),
            Some(Item::Literal(_)) => Err(self.slot(alias)?.mismatch("not an object property")),
            None => Ok(None),
        }
    }

    /// Replace a property's value
    pub fn set(&self, alias: &str, value: impl Into<Value>) -> ProxyResult<()> {
        self.set_many(alias, [value.into()])
    }

    /// Replace a property with exactly `values`
    pub fn set_many(
        &self,
        alias: &str,
        values: impl IntoIterator<Item = Value>,
    ) -> ProxyResult<()> {
        let slot = self.slot(alias)?;
        let values: Vec<Value> = values.into_iter().collect();
        match slot.entry.cardinality {
            Cardinality::List => LdList::new(slot).replace_all(values),
            Cardinality::Single if values.len() > 1 => Err(slot.mismatch(format!(
                "cannot store {} values in a single-valued property",
                values.len()
            ))),
            Cardinality::Single | Cardinality::Set => {
                let terms = values
                    .iter()
                    .map(|v| slot.encode(v))
                    .collect::<ProxyResult<IndexSet<_>>>()?;
                slot.replace(terms.into_iter().collect())
            }
        }
    }

    /// Remove every value of a property
    pub fn delete(&self, alias: &str) -> ProxyResult<()> {
        let slot = self.slot(alias)?;
        match slot.entry.cardinality {
            Cardinality::List => LdList::new(slot).detach(),
            _ => slot.replace(Vec::new()),
        }
    }

    /// Set view of a multi-valued property
    pub fn set_of(&self, alias: &str) -> ProxyResult<LdSet> {
        let slot = self.slot(alias)?;
        if slot.entry.cardinality == Cardinality::List {
            return Err(slot.mismatch("list property read as a set"));
        }
        Ok(LdSet::new(slot))
    }

    /// List view of an ordered property
    pub fn list_of(&self, alias: &str) -> ProxyResult<LdList> {
        let slot = self.slot(alias)?;
        if slot.entry.cardinality != Cardinality::List {
            return Err(slot.mismatch(format!(
                "{:?} property read as a list",
                slot.entry.cardinality
            )));
        }
        Ok(LdList::new(slot))
    }
}

impl PartialEq for LdoProxy {
    fn eq(&self, other: &Self) -> bool {
        self.subject == other.subject
            && self.shape == other.shape
            && self.scope.store.same_store(&other.scope.store)
    }
}

impl fmt::Debug for LdoProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdoProxy")
            .field("subject", &self.subject)
            .field("shape", &self.shape)
            .finish()
    }
}
