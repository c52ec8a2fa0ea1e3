//! Linked data objects
//!
//! Typed, schema-driven object views over an RDF quad dataset. A proxy reads
//! and writes quads through an alias table derived from a shape schema, so
//! application code works with plain properties while the dataset stays the
//! single source of truth.
//!
//! # Layers
//!
//! - `rdf`: terms, a set-semantics quad store, a subscribable store with
//!   transactions, change sets and text formats
//! - `shex`: a ShExJ schema model, a memoized traversal, context generation
//!   and shape validation
//! - `proxy`: live typed views (`LdoProxy`, `LdSet`, `LdList`) and literal
//!   coercion
//! - `config`: proxy options loaded from YAML or JSON
//!
//! ## Example Usage
//!
//! ```rust
//! use ldo::rdf::{NamedNode, SubscribableStore};
//! use ldo::shex::Schema;
//! use ldo::{ProxyEngine, ProxyOptions};
//!
//! let schema = Schema::from_json(r#"{
//!   "type": "Schema",
//!   "shapes": [{
//!     "type": "Shape",
//!     "id": "http://example.org/Person",
//!     "expression": {
//!       "type": "TripleConstraint",
//!       "predicate": "http://xmlns.com/foaf/0.1/name",
//!       "valueExpr": { "type": "NodeConstraint", "datatype": "http://www.w3.org/2001/XMLSchema#string" }
//!     }
//!   }]
//! }"#).unwrap();
//!
//! let engine = ProxyEngine::from_schema(SubscribableStore::new(), &schema, ProxyOptions::default()).unwrap();
//! let alice = engine
//!     .from_subject("http://example.org/Person", NamedNode::new("http://example.org/alice").unwrap())
//!     .unwrap();
//! alice.set("name", "Alice").unwrap();
//!
//! assert_eq!(alice.get_literal("name").unwrap().unwrap().as_str(), Some("Alice"));
//! assert_eq!(engine.store().len(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod proxy;
pub mod rdf;
pub mod shex;

// Re-export main types for convenience
pub use config::{ConfigError, ConfigResult, ProxyOptions};

pub use proxy::{
    Cardinality, ContextEntry, Item, LdList, LdSet, LdoContext, LdoProxy, NativeValue, Property,
    ProxyEngine, ProxyError, ProxyResult, ShapeContext, Value, ValueKind,
};

pub use rdf::{
    BlankNode, ChangeManager, Dataset, DatasetChanges, Literal, NamedNode, Quad, QuadPattern,
    QuadStore, RdfError, RdfFormat, RdfGraph, RdfObject, RdfParser, RdfPredicate, RdfResult,
    RdfSerializer, RdfSubject, RdfTerm, SubscribableStore, SubscriptionHandle,
};

pub use shex::{ContextBuilder, Schema, SchemaError, SchemaResult, ShapeValidator, Verdict};
