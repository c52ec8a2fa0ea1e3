//! Typed proxies over a quad store
//!
//! A proxy is a (subject, store, context) view with no state of its own:
//! every read is a pattern match against the shared store and every write is
//! a quad edit on it. Property aliases are resolved through an explicit
//! alias table (`LdoContext`) before each access.
//!
//! Multi-valued properties are exposed as live `LdSet` and `LdList` views,
//! and object-valued properties as nested proxies built only when read, so
//! cyclic data never causes eager recursion.
//!
//! # Example
//!
//! ```rust
//! use ldo::proxy::{ContextEntry, LdoContext, ProxyEngine, ShapeContext};
//! use ldo::rdf::{NamedNode, RdfPredicate, SubscribableStore};
//! use ldo::ProxyOptions;
//!
//! let mut person = ShapeContext::new();
//! person.insert(
//!     "name",
//!     ContextEntry::literal(RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap()),
//! );
//! let mut context = LdoContext::new();
//! context.insert_shape("Person", person);
//!
//! let engine = ProxyEngine::new(SubscribableStore::new(), context, ProxyOptions::default()).unwrap();
//! let alice = engine
//!     .from_subject("Person", NamedNode::new("http://example.org/alice").unwrap())
//!     .unwrap();
//! alice.set("name", "Alice").unwrap();
//! assert_eq!(engine.store().len(), 1);
//! ```

mod coerce;
mod context;
mod list;
mod materialize;
mod object;
mod set;

use crate::config::ProxyOptions;
use crate::rdf::{BlankNode, RdfError, RdfGraph, RdfSubject, SubscribableStore};
use crate::shex::{ContextBuilder, Schema, SchemaError};
use serde_json::Value as JsonValue;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

pub use coerce::{
    check_native, datatype_accepts, from_json_typed, from_native, is_supported, to_native,
    NativeValue,
};
pub use context::{Cardinality, ContextEntry, LdoContext, ShapeContext, ValueKind};
pub use list::LdList;
pub use object::{Item, LdoProxy, Property, Value};
pub use set::LdSet;

/// Proxy errors
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Unknown alias {alias} (shape: {shape:?})")]
    UnknownAlias {
        alias: String,
        shape: Option<String>,
    },

    #[error("Unknown shape: {0}")]
    UnknownShape(String),

    /// Data or a written value disagrees with the declared property
    #[error("Shape mismatch on {alias}: {reason}")]
    ShapeMismatch { alias: String, reason: String },

    #[error("Cannot coerce literal {value:?} of datatype {datatype}")]
    UnsupportedDatatype { datatype: String, value: String },

    #[error("Malformed list: {0}")]
    MalformedList(String),

    #[error("Index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("RDF error: {0}")]
    Rdf(#[from] RdfError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type ProxyResult<T> = Result<T, ProxyError>;

/// Everything a view needs besides its own coordinates
#[derive(Clone)]
pub(crate) struct Scope {
    pub(crate) store: SubscribableStore,
    pub(crate) context: Rc<LdoContext>,
    pub(crate) read_graph: Option<RdfGraph>,
    pub(crate) write_graph: RdfGraph,
    pub(crate) strict_literals: bool,
    pub(crate) languages: Rc<[String]>,
}

impl Scope {
    /// Same scope with reads and writes limited to `graph`
    pub(crate) fn in_graph(&self, graph: RdfGraph) -> Self {
        Self {
            read_graph: Some(graph.clone()),
            write_graph: graph,
            ..self.clone()
        }
    }
}

/// Entry point for building proxies over one store and context
pub struct ProxyEngine {
    scope: Scope,
}

impl ProxyEngine {
    pub fn new(
        store: SubscribableStore,
        context: LdoContext,
        options: ProxyOptions,
    ) -> ProxyResult<Self> {
        let scope = Scope {
            store,
            context: Rc::new(context),
            read_graph: options.read_graph()?,
            write_graph: options.write_graph()?,
            strict_literals: options.strict_literals,
            languages: options.languages.into(),
        };
        debug!(
            "Proxy engine over {} shapes (write graph {})",
            scope.context.len(),
            scope.write_graph
        );
        Ok(Self { scope })
    }

    /// Build the context from a ShExJ schema
    pub fn from_schema(
        store: SubscribableStore,
        schema: &Schema,
        options: ProxyOptions,
    ) -> ProxyResult<Self> {
        let context = ContextBuilder::new().build(schema)?;
        Self::new(store, context, options)
    }

    pub fn store(&self) -> &SubscribableStore {
        &self.scope.store
    }

    pub fn context(&self) -> &LdoContext {
        &self.scope.context
    }

    /// View `subject` through `shape`
    pub fn from_subject(
        &self,
        shape: &str,
        subject: impl Into<RdfSubject>,
    ) -> ProxyResult<LdoProxy> {
        self.scope.context.require_shape(shape)?;
        Ok(LdoProxy::new(
            self.scope.clone(),
            subject.into(),
            Some(shape.to_string()),
        ))
    }

    /// View `subject` through the aliases of every shape
    pub fn untyped(&self, subject: impl Into<RdfSubject>) -> LdoProxy {
        LdoProxy::new(self.scope.clone(), subject.into(), None)
    }

    /// View a fresh blank node through `shape`
    pub fn create_blank(&self, shape: &str) -> ProxyResult<LdoProxy> {
        self.from_subject(shape, BlankNode::new())
    }

    /// Write a JSON object as a new subject (`@id` or a fresh blank node)
    pub fn from_json(&self, shape: &str, json: &JsonValue) -> ProxyResult<LdoProxy> {
        let subject = match json.get("@id").and_then(JsonValue::as_str) {
            Some(id) => RdfSubject::parse(id)?,
            None => BlankNode::new().into(),
        };
        let proxy = self.from_subject(shape, subject)?;
        proxy.assign_json(json)?;
        Ok(proxy)
    }
}
