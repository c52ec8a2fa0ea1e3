//! Shape expressions
//!
//! A ShExJ schema model plus a generic, memoized traversal over it. Two
//! visitors ride on the same traversal:
//! - `ContextBuilder` derives the alias tables proxies read and write through
//! - `ShapeValidator` checks a focus node of a dataset against a shape

mod context;
mod schema;
mod traverser;
mod validate;

use crate::rdf::RdfError;
use thiserror::Error;

pub use context::{BuildState, ContextBuilder, Fragment};
pub use schema::{
    cardinality, Annotation, EachOf, NodeConstraint, NodeKind, ObjectLiteral, ObjectValue, OneOf,
    Schema, Shape, ShapeAnd, ShapeDecl, ShapeExpr, ShapeExprRef, ShapeExternal, ShapeNot, ShapeOr,
    StemValue, TripleConstraint, TripleExpr, TripleExprRef, ValueSetValue, UNBOUNDED,
};
pub use traverser::{traverse_expr, traverse_shape, ShapeNodeKind, ShapeVisitor, Traversal};
pub use validate::{ShapeValidator, ValidationState, Verdict};

/// Schema errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid ShExJ: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unresolved shape label: {0}")]
    UnresolvedShape(String),

    #[error("Unresolved triple expression label: {0}")]
    UnresolvedTripleExpr(String),

    #[error("Invalid IRI in schema: {0}")]
    Rdf(#[from] RdfError),

    #[error("Invalid pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

pub type SchemaResult<T> = Result<T, SchemaError>;
