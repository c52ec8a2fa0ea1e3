//! RDF text formats
//!
//! Supports:
//! - Turtle (TTL)
//! - N-Triples (NT)
//! - N-Quads (NQ)
//! - TriG

mod turtle;

use super::{QuadStore, RdfGraph};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// Turtle format (.ttl)
    Turtle,
    /// N-Triples format (.nt)
    NTriples,
    /// N-Quads format (.nq)
    NQuads,
    /// TriG format (.trig)
    TriG,
}

impl RdfFormat {
    /// Guess the format from a file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ttl" => Some(RdfFormat::Turtle),
            "nt" => Some(RdfFormat::NTriples),
            "nq" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            _ => None,
        }
    }

    /// Whether the format can carry named graphs
    pub fn supports_graphs(&self) -> bool {
        matches!(self, RdfFormat::NQuads | RdfFormat::TriG)
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// The format cannot represent quads outside the default graph
    #[error("{format:?} cannot represent {count} quads in named graphs")]
    NamedGraphsUnsupported { format: RdfFormat, count: usize },
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse RDF text into a quad store; triple formats land in the default graph
    pub fn parse(input: &str, format: RdfFormat) -> ParseResult<QuadStore> {
        Self::parse_into_graph(input, format, &RdfGraph::DefaultGraph)
    }

    /// Parse RDF text, placing default-graph statements into `graph`
    pub fn parse_into_graph(
        input: &str,
        format: RdfFormat,
        graph: &RdfGraph,
    ) -> ParseResult<QuadStore> {
        let quads = turtle::parse(input.as_bytes(), format, graph)?;
        let store = QuadStore::from_quads(quads);
        info!("Parsed {} quads from {:?} input", store.len(), format);
        Ok(store)
    }

    /// Parse RDF data from a file, picking the format from its extension
    pub fn parse_file(path: &Path) -> ParseResult<QuadStore> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(RdfFormat::from_extension)
            .ok_or_else(|| {
                ParseError::Parse(format!("Unknown RDF file extension: {}", path.display()))
            })?;
        let input = std::fs::read_to_string(path)?;
        Self::parse(&input, format)
    }
}

/// RDF serializer
pub struct RdfSerializer;

impl RdfSerializer {
    /// Serialize a quad store to a string
    ///
    /// Triple formats refuse stores holding named-graph quads rather than
    /// silently dropping them.
    pub fn serialize(store: &QuadStore, format: RdfFormat) -> SerializeResult<String> {
        if !format.supports_graphs() {
            let count = store.iter().filter(|q| !q.graph.is_default_graph()).count();
            if count > 0 {
                return Err(SerializeError::NamedGraphsUnsupported { format, count });
            }
        }
        turtle::serialize(store, format)
    }

    /// Serialize a quad store to a file
    pub fn serialize_file(store: &QuadStore, path: &Path, format: RdfFormat) -> SerializeResult<()> {
        let output = Self::serialize(store, format)?;
        std::fs::write(path, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{NamedNode, Quad, RdfPredicate, Literal};
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(RdfFormat::from_extension("TTL"), Some(RdfFormat::Turtle));
        assert_eq!(RdfFormat::from_extension("nq"), Some(RdfFormat::NQuads));
        assert_eq!(RdfFormat::from_extension("json"), None);
    }

    #[test]
    fn test_triple_format_rejects_named_graphs() {
        let quad = Quad::new(
            NamedNode::new("http://example.org/a").unwrap(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal("x"),
            NamedNode::new("http://example.org/g").unwrap(),
        );
        let store = QuadStore::from_quads(vec![quad]);

        let result = RdfSerializer::serialize(&store, RdfFormat::NTriples);
        assert!(matches!(
            result,
            Err(SerializeError::NamedGraphsUnsupported { count: 1, .. })
        ));
        assert!(RdfSerializer::serialize(&store, RdfFormat::NQuads).is_ok());
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::Builder::new().suffix(".ttl").tempfile().unwrap();
        writeln!(
            file,
            "@prefix foaf: <http://xmlns.com/foaf/0.1/> .\n<http://example.org/alice> foaf:name \"Alice\" ."
        )
        .unwrap();

        let store = RdfParser::parse_file(file.path()).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_parse_file_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        assert!(RdfParser::parse_file(file.path()).is_err());
    }
}
