//! RDF dataset layer
//!
//! This module implements the quad-level substrate the proxy views run on:
//! - RDF terms and quads (wrapping oxrdf)
//! - A set-semantics quad store with pattern matching
//! - A subscribable store with deferred, pattern-scoped notifications and transactions
//! - Change sets and their per-graph grouping
//! - Turtle / N-Triples / N-Quads / TriG text formats
//!
//! # Example
//!
//! ```rust
//! use ldo::rdf::{QuadStore, Quad, NamedNode, Literal, RdfPredicate, QuadPattern};
//!
//! let mut store = QuadStore::new();
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let quad = Quad::in_default_graph(subject.clone(), predicate, Literal::new_simple_literal("Alice"));
//!
//! store.insert(quad.clone());
//! store.insert(quad);
//!
//! let results = store.query(&QuadPattern::any().subject(subject));
//! assert_eq!(results.len(), 1);
//! ```

mod changes;
pub mod namespace;
mod serialization;
mod store;
mod subscribable;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfGraph, RdfObject,
    RdfPredicate, RdfResult, RdfSubject, RdfTerm,
};

pub use store::{Dataset, QuadStore};

pub use subscribable::{SubscribableStore, SubscriptionHandle};

pub use changes::{ChangeManager, DatasetChanges};

pub use namespace::{NamespaceManager, PrefixError, PrefixResult};

pub use serialization::{
    ParseError, ParseResult, RdfFormat, RdfParser, RdfSerializer, SerializeError,
    SerializeResult,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rdf_module_exports() {
        let _store: QuadStore = QuadStore::new();
        let _shared = SubscribableStore::new();
        let _changes = DatasetChanges::new();
        let _ns_mgr = NamespaceManager::new();
    }
}
