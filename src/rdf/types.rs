//! RDF type definitions
//!
//! This module provides wrapper types around the oxrdf library for RDF primitives,
//! plus the quad and quad-pattern values the dataset layer is built on.

use oxrdf::{
    BlankNode as OxBlankNode, Literal as OxLiteral, NamedNode as OxNamedNode,
    NamedNodeRef as OxNamedNodeRef,
};
use std::fmt;
use thiserror::Error;

/// RDF errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RdfError {
    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),

    /// Invalid blank node
    #[error("Invalid blank node: {0}")]
    InvalidBlankNode(String),

    /// Invalid literal
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    /// A term was used in a quad position it cannot occupy
    #[error("Invalid term in {position} position: {term}")]
    InvalidTerm {
        position: &'static str,
        term: String,
    },
}

pub type RdfResult<T> = Result<T, RdfError>;

/// Named node (IRI)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedNode(OxNamedNode);

impl NamedNode {
    /// Create a new named node from an IRI string
    pub fn new(iri: &str) -> RdfResult<Self> {
        OxNamedNode::new(iri)
            .map(Self)
            .map_err(|e| RdfError::InvalidIri(format!("{}: {}", iri, e)))
    }

    /// Get the IRI string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Get the inner oxrdf NamedNode
    pub fn inner(&self) -> &OxNamedNode {
        &self.0
    }
}

impl fmt::Display for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

impl From<OxNamedNode> for NamedNode {
    fn from(node: OxNamedNode) -> Self {
        Self(node)
    }
}

impl From<OxNamedNodeRef<'_>> for NamedNode {
    fn from(node: OxNamedNodeRef<'_>) -> Self {
        Self(node.into_owned())
    }
}

impl PartialEq<OxNamedNodeRef<'_>> for NamedNode {
    fn eq(&self, other: &OxNamedNodeRef<'_>) -> bool {
        self.0.as_ref() == *other
    }
}

/// Blank node (anonymous node)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlankNode(OxBlankNode);

impl BlankNode {
    /// Create a new blank node with a unique identifier
    pub fn new() -> Self {
        Self(OxBlankNode::default())
    }

    /// Create a blank node from a string identifier
    pub fn from_id(id: &str) -> RdfResult<Self> {
        OxBlankNode::new(id)
            .map(Self)
            .map_err(|e| RdfError::InvalidBlankNode(format!("{}: {}", id, e)))
    }

    /// Get the blank node identifier
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for BlankNode {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.as_str())
    }
}

/// RDF literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(OxLiteral);

impl Literal {
    /// Create a simple literal (xsd:string)
    pub fn new_simple_literal(value: impl Into<String>) -> Self {
        Self(OxLiteral::new_simple_literal(value))
    }

    /// Create a literal with language tag
    pub fn new_language_tagged_literal(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> RdfResult<Self> {
        OxLiteral::new_language_tagged_literal(value, language)
            .map(Self)
            .map_err(|e| RdfError::InvalidLiteral(e.to_string()))
    }

    /// Create a typed literal
    pub fn new_typed_literal(value: impl Into<String>, datatype: NamedNode) -> Self {
        Self(OxLiteral::new_typed_literal(value, datatype.0))
    }

    /// Get the lexical value
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// Get the language tag if present
    pub fn language(&self) -> Option<&str> {
        self.0.language()
    }

    /// Get the datatype
    pub fn datatype(&self) -> NamedNode {
        NamedNode(self.0.datatype().into_owned())
    }

    /// Borrow the datatype IRI
    pub fn datatype_iri(&self) -> &str {
        self.0.datatype().as_str()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let escaped = self
            .value()
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n");
        if let Some(lang) = self.language() {
            write!(f, "\"{}\"@{}", escaped, lang)
        } else {
            write!(f, "\"{}\"^^{}", escaped, self.datatype())
        }
    }
}

/// RDF subject (NamedNode or BlankNode)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfSubject {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
}

impl RdfSubject {
    /// Check if this is a named node
    pub fn is_named_node(&self) -> bool {
        matches!(self, RdfSubject::NamedNode(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, RdfSubject::BlankNode(_))
    }

    /// Parse `_:id` as a blank node and anything else as an IRI
    pub fn parse(value: &str) -> RdfResult<Self> {
        match value.strip_prefix("_:") {
            Some(id) => Ok(BlankNode::from_id(id)?.into()),
            None => Ok(NamedNode::new(value)?.into()),
        }
    }

    /// IRI string or `_:id` form, as used for JSON `@id` values
    pub fn to_id_string(&self) -> String {
        match self {
            RdfSubject::NamedNode(n) => n.as_str().to_string(),
            RdfSubject::BlankNode(b) => format!("_:{}", b.as_str()),
        }
    }
}

impl fmt::Display for RdfSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfSubject::NamedNode(n) => write!(f, "{}", n),
            RdfSubject::BlankNode(b) => write!(f, "{}", b),
        }
    }
}

impl From<NamedNode> for RdfSubject {
    fn from(node: NamedNode) -> Self {
        RdfSubject::NamedNode(node)
    }
}

impl From<BlankNode> for RdfSubject {
    fn from(node: BlankNode) -> Self {
        RdfSubject::BlankNode(node)
    }
}

impl TryFrom<RdfObject> for RdfSubject {
    type Error = RdfError;

    fn try_from(object: RdfObject) -> RdfResult<Self> {
        match object {
            RdfObject::NamedNode(n) => Ok(RdfSubject::NamedNode(n)),
            RdfObject::BlankNode(b) => Ok(RdfSubject::BlankNode(b)),
            RdfObject::Literal(l) => Err(RdfError::InvalidTerm {
                position: "subject",
                term: l.to_string(),
            }),
        }
    }
}

impl TryFrom<RdfTerm> for RdfSubject {
    type Error = RdfError;

    fn try_from(term: RdfTerm) -> RdfResult<Self> {
        match term {
            RdfTerm::NamedNode(n) => Ok(RdfSubject::NamedNode(n)),
            RdfTerm::BlankNode(b) => Ok(RdfSubject::BlankNode(b)),
            other => Err(RdfError::InvalidTerm {
                position: "subject",
                term: other.to_string(),
            }),
        }
    }
}

/// RDF predicate (always a NamedNode)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RdfPredicate(NamedNode);

impl RdfPredicate {
    /// Create a new predicate from an IRI
    pub fn new(iri: &str) -> RdfResult<Self> {
        Ok(Self(NamedNode::new(iri)?))
    }

    /// Get the underlying named node
    pub fn as_named_node(&self) -> &NamedNode {
        &self.0
    }

    /// Get the IRI string
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RdfPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<NamedNode> for RdfPredicate {
    fn from(node: NamedNode) -> Self {
        RdfPredicate(node)
    }
}

impl From<OxNamedNodeRef<'_>> for RdfPredicate {
    fn from(node: OxNamedNodeRef<'_>) -> Self {
        RdfPredicate(node.into())
    }
}

impl From<RdfPredicate> for NamedNode {
    fn from(pred: RdfPredicate) -> Self {
        pred.0
    }
}

impl TryFrom<RdfTerm> for RdfPredicate {
    type Error = RdfError;

    fn try_from(term: RdfTerm) -> RdfResult<Self> {
        match term {
            RdfTerm::NamedNode(n) => Ok(RdfPredicate(n)),
            other => Err(RdfError::InvalidTerm {
                position: "predicate",
                term: other.to_string(),
            }),
        }
    }
}

/// RDF object (NamedNode, BlankNode, or Literal)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfObject {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
    /// Literal value
    Literal(Literal),
}

impl RdfObject {
    /// Check if this is a named node
    pub fn is_named_node(&self) -> bool {
        matches!(self, RdfObject::NamedNode(_))
    }

    /// Check if this is a blank node
    pub fn is_blank_node(&self) -> bool {
        matches!(self, RdfObject::BlankNode(_))
    }

    /// Check if this is a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, RdfObject::Literal(_))
    }

    /// Borrow the literal, if this is one
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            RdfObject::Literal(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for RdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfObject::NamedNode(n) => write!(f, "{}", n),
            RdfObject::BlankNode(b) => write!(f, "{}", b),
            RdfObject::Literal(l) => write!(f, "{}", l),
        }
    }
}

impl From<NamedNode> for RdfObject {
    fn from(node: NamedNode) -> Self {
        RdfObject::NamedNode(node)
    }
}

impl From<OxNamedNodeRef<'_>> for RdfObject {
    fn from(node: OxNamedNodeRef<'_>) -> Self {
        RdfObject::NamedNode(node.into())
    }
}

impl From<BlankNode> for RdfObject {
    fn from(node: BlankNode) -> Self {
        RdfObject::BlankNode(node)
    }
}

impl From<Literal> for RdfObject {
    fn from(lit: Literal) -> Self {
        RdfObject::Literal(lit)
    }
}

impl From<RdfSubject> for RdfObject {
    fn from(subject: RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => RdfObject::NamedNode(n),
            RdfSubject::BlankNode(b) => RdfObject::BlankNode(b),
        }
    }
}

impl TryFrom<RdfTerm> for RdfObject {
    type Error = RdfError;

    fn try_from(term: RdfTerm) -> RdfResult<Self> {
        match term {
            RdfTerm::NamedNode(n) => Ok(RdfObject::NamedNode(n)),
            RdfTerm::BlankNode(b) => Ok(RdfObject::BlankNode(b)),
            RdfTerm::Literal(l) => Ok(RdfObject::Literal(l)),
            RdfTerm::DefaultGraph => Err(RdfError::InvalidTerm {
                position: "object",
                term: RdfTerm::DefaultGraph.to_string(),
            }),
        }
    }
}

/// Graph component of a quad
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum RdfGraph {
    /// Named graph identified by an IRI
    NamedNode(NamedNode),
    /// Named graph identified by a blank node
    BlankNode(BlankNode),
    /// The default graph
    #[default]
    DefaultGraph,
}

impl RdfGraph {
    /// Check if this is the default graph
    pub fn is_default_graph(&self) -> bool {
        matches!(self, RdfGraph::DefaultGraph)
    }

    /// Parse a graph name; `None` is the default graph
    pub fn parse(value: Option<&str>) -> RdfResult<Self> {
        match value {
            None => Ok(RdfGraph::DefaultGraph),
            Some(v) => Ok(RdfSubject::parse(v)?.into()),
        }
    }
}

impl fmt::Display for RdfGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfGraph::NamedNode(n) => write!(f, "{}", n),
            RdfGraph::BlankNode(b) => write!(f, "{}", b),
            RdfGraph::DefaultGraph => write!(f, "DEFAULT"),
        }
    }
}

impl From<NamedNode> for RdfGraph {
    fn from(node: NamedNode) -> Self {
        RdfGraph::NamedNode(node)
    }
}

impl From<BlankNode> for RdfGraph {
    fn from(node: BlankNode) -> Self {
        RdfGraph::BlankNode(node)
    }
}

impl From<RdfSubject> for RdfGraph {
    fn from(subject: RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => RdfGraph::NamedNode(n),
            RdfSubject::BlankNode(b) => RdfGraph::BlankNode(b),
        }
    }
}

impl TryFrom<RdfTerm> for RdfGraph {
    type Error = RdfError;

    fn try_from(term: RdfTerm) -> RdfResult<Self> {
        match term {
            RdfTerm::NamedNode(n) => Ok(RdfGraph::NamedNode(n)),
            RdfTerm::BlankNode(b) => Ok(RdfGraph::BlankNode(b)),
            RdfTerm::DefaultGraph => Ok(RdfGraph::DefaultGraph),
            RdfTerm::Literal(l) => Err(RdfError::InvalidTerm {
                position: "graph",
                term: l.to_string(),
            }),
        }
    }
}

/// RDF term (any RDF value, including the default graph marker)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RdfTerm {
    /// Named node (IRI)
    NamedNode(NamedNode),
    /// Blank node
    BlankNode(BlankNode),
    /// Literal value
    Literal(Literal),
    /// The default graph
    DefaultGraph,
}

impl fmt::Display for RdfTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RdfTerm::NamedNode(n) => write!(f, "{}", n),
            RdfTerm::BlankNode(b) => write!(f, "{}", b),
            RdfTerm::Literal(l) => write!(f, "{}", l),
            RdfTerm::DefaultGraph => write!(f, "DEFAULT"),
        }
    }
}

impl From<NamedNode> for RdfTerm {
    fn from(node: NamedNode) -> Self {
        RdfTerm::NamedNode(node)
    }
}

impl From<BlankNode> for RdfTerm {
    fn from(node: BlankNode) -> Self {
        RdfTerm::BlankNode(node)
    }
}

impl From<Literal> for RdfTerm {
    fn from(lit: Literal) -> Self {
        RdfTerm::Literal(lit)
    }
}

impl From<RdfSubject> for RdfTerm {
    fn from(subject: RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => RdfTerm::NamedNode(n),
            RdfSubject::BlankNode(b) => RdfTerm::BlankNode(b),
        }
    }
}

impl From<RdfObject> for RdfTerm {
    fn from(object: RdfObject) -> Self {
        match object {
            RdfObject::NamedNode(n) => RdfTerm::NamedNode(n),
            RdfObject::BlankNode(b) => RdfTerm::BlankNode(b),
            RdfObject::Literal(l) => RdfTerm::Literal(l),
        }
    }
}

impl From<RdfGraph> for RdfTerm {
    fn from(graph: RdfGraph) -> Self {
        match graph {
            RdfGraph::NamedNode(n) => RdfTerm::NamedNode(n),
            RdfGraph::BlankNode(b) => RdfTerm::BlankNode(b),
            RdfGraph::DefaultGraph => RdfTerm::DefaultGraph,
        }
    }
}

/// RDF quad (subject, predicate, object, graph)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    /// Subject
    pub subject: RdfSubject,
    /// Predicate
    pub predicate: RdfPredicate,
    /// Object
    pub object: RdfObject,
    /// Graph
    pub graph: RdfGraph,
}

impl Quad {
    /// Create a new quad
    pub fn new(
        subject: impl Into<RdfSubject>,
        predicate: impl Into<RdfPredicate>,
        object: impl Into<RdfObject>,
        graph: impl Into<RdfGraph>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph: graph.into(),
        }
    }

    /// Create a quad in the default graph
    pub fn in_default_graph(
        subject: impl Into<RdfSubject>,
        predicate: impl Into<RdfPredicate>,
        object: impl Into<RdfObject>,
    ) -> Self {
        Self::new(subject, predicate, object, RdfGraph::DefaultGraph)
    }

    /// Build a quad from loose terms, rejecting terms in positions they cannot occupy
    pub fn try_from_terms(
        subject: RdfTerm,
        predicate: RdfTerm,
        object: RdfTerm,
        graph: RdfTerm,
    ) -> RdfResult<Self> {
        Ok(Self {
            subject: subject.try_into()?,
            predicate: predicate.try_into()?,
            object: object.try_into()?,
            graph: graph.try_into()?,
        })
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.graph.is_default_graph() {
            write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
        } else {
            write!(
                f,
                "{} {} {} {} .",
                self.subject, self.predicate, self.object, self.graph
            )
        }
    }
}

/// Quad pattern for matching (None = wildcard)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct QuadPattern {
    /// Subject (None = variable)
    pub subject: Option<RdfSubject>,
    /// Predicate (None = variable)
    pub predicate: Option<RdfPredicate>,
    /// Object (None = variable)
    pub object: Option<RdfObject>,
    /// Graph (None = variable, Some(DefaultGraph) = default graph only)
    pub graph: Option<RdfGraph>,
}

impl QuadPattern {
    /// Create a new quad pattern
    pub fn new(
        subject: Option<RdfSubject>,
        predicate: Option<RdfPredicate>,
        object: Option<RdfObject>,
        graph: Option<RdfGraph>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph,
        }
    }

    /// Pattern matching every quad
    pub fn any() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<RdfSubject>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<RdfPredicate>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn object(mut self, object: impl Into<RdfObject>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn graph(mut self, graph: impl Into<RdfGraph>) -> Self {
        self.graph = Some(graph.into());
        self
    }

    /// Check if a quad matches this pattern
    pub fn matches(&self, quad: &Quad) -> bool {
        if let Some(ref s) = self.subject {
            if s != &quad.subject {
                return false;
            }
        }
        if let Some(ref p) = self.predicate {
            if p != &quad.predicate {
                return false;
            }
        }
        if let Some(ref o) = self.object {
            if o != &quad.object {
                return false;
            }
        }
        if let Some(ref g) = self.graph {
            if g != &quad.graph {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> NamedNode {
        NamedNode::new("http://example.org/alice").unwrap()
    }

    fn name() -> RdfPredicate {
        RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap()
    }

    #[test]
    fn test_named_node() {
        let node = alice();
        assert_eq!(node.as_str(), "http://example.org/alice");
        assert_eq!(node.to_string(), "<http://example.org/alice>");
        assert!(NamedNode::new("not an iri").is_err());
    }

    #[test]
    fn test_blank_node() {
        let node1 = BlankNode::new();
        let node2 = BlankNode::new();
        assert_ne!(node1, node2);

        let named = BlankNode::from_id("b0").unwrap();
        assert_eq!(named.to_string(), "_:b0");
    }

    #[test]
    fn test_literal() {
        let lit = Literal::new_simple_literal("Alice");
        assert_eq!(lit.value(), "Alice");
        assert_eq!(
            lit.datatype().as_str(),
            "http://www.w3.org/2001/XMLSchema#string"
        );

        let lit = Literal::new_language_tagged_literal("Alice", "en").unwrap();
        assert_eq!(lit.language(), Some("en"));
    }

    #[test]
    fn test_structural_equality() {
        let a = Quad::in_default_graph(alice(), name(), Literal::new_simple_literal("Alice"));
        let b = Quad::in_default_graph(alice(), name(), Literal::new_simple_literal("Alice"));
        assert_eq!(a, b);

        let c = Quad::new(
            alice(),
            name(),
            Literal::new_simple_literal("Alice"),
            NamedNode::new("http://example.org/g").unwrap(),
        );
        assert_ne!(a, c);
    }

    #[test]
    fn test_literal_subject_is_invalid_term() {
        let result = Quad::try_from_terms(
            Literal::new_simple_literal("oops").into(),
            name().as_named_node().clone().into(),
            alice().into(),
            RdfTerm::DefaultGraph,
        );
        assert!(matches!(
            result,
            Err(RdfError::InvalidTerm { position: "subject", .. })
        ));
    }

    #[test]
    fn test_default_graph_object_is_invalid_term() {
        let result = Quad::try_from_terms(
            alice().into(),
            name().as_named_node().clone().into(),
            RdfTerm::DefaultGraph,
            RdfTerm::DefaultGraph,
        );
        assert!(matches!(
            result,
            Err(RdfError::InvalidTerm { position: "object", .. })
        ));
    }

    #[test]
    fn test_blank_predicate_is_invalid_term() {
        let result = Quad::try_from_terms(
            alice().into(),
            BlankNode::new().into(),
            alice().into(),
            RdfTerm::DefaultGraph,
        );
        assert!(matches!(
            result,
            Err(RdfError::InvalidTerm { position: "predicate", .. })
        ));
    }

    #[test]
    fn test_quad_pattern_matching() {
        let quad = Quad::in_default_graph(alice(), name(), Literal::new_simple_literal("Alice"));

        assert!(QuadPattern::any().matches(&quad));
        assert!(QuadPattern::any().subject(alice()).matches(&quad));
        assert!(QuadPattern::any()
            .graph(RdfGraph::DefaultGraph)
            .matches(&quad));

        let bob = NamedNode::new("http://example.org/bob").unwrap();
        assert!(!QuadPattern::any().subject(bob).matches(&quad));
        assert!(!QuadPattern::any()
            .graph(NamedNode::new("http://example.org/g").unwrap())
            .matches(&quad));
    }

    #[test]
    fn test_subject_id_strings() {
        let s = RdfSubject::parse("_:x1").unwrap();
        assert!(s.is_blank_node());
        assert_eq!(s.to_id_string(), "_:x1");

        let s = RdfSubject::parse("http://example.org/alice").unwrap();
        assert!(s.is_named_node());
    }
}
