//! RDF namespace and prefix management
//!
//! Prefix handling for compact IRIs in contexts, plus the vocabulary terms
//! the proxy layer relies on (list links, `rdf:type`, XSD datatypes).

use std::collections::HashMap;
use thiserror::Error;

/// Prefix errors
#[derive(Error, Debug)]
pub enum PrefixError {
    /// Unknown prefix
    #[error("Unknown prefix: {0}")]
    UnknownPrefix(String),

    /// Invalid IRI
    #[error("Invalid IRI: {0}")]
    InvalidIri(String),
}

pub type PrefixResult<T> = Result<T, PrefixError>;

/// `rdf:` terms
pub mod rdf {
    pub use oxrdf::vocab::rdf::{FIRST, LANG_STRING, LIST, NIL, REST, TYPE};
}

/// `rdfs:` terms
pub mod rdfs {
    pub use oxrdf::vocab::rdfs::LABEL;
}

/// `xsd:` datatypes recognised by literal coercion
pub mod xsd {
    pub use oxrdf::vocab::xsd::{
        BOOLEAN, BYTE, DATE, DATE_TIME, DECIMAL, DOUBLE, FLOAT, INT, INTEGER, LONG,
        NEGATIVE_INTEGER, NON_NEGATIVE_INTEGER, NON_POSITIVE_INTEGER, POSITIVE_INTEGER, SHORT,
        STRING, UNSIGNED_BYTE, UNSIGNED_INT, UNSIGNED_LONG, UNSIGNED_SHORT,
    };
}

/// Namespace manager with common prefixes
#[derive(Debug, Clone)]
pub struct NamespaceManager {
    /// Prefix → IRI mappings
    prefixes: HashMap<String, String>,
}

impl NamespaceManager {
    /// Create a new namespace manager with common prefixes
    pub fn new() -> Self {
        let mut mgr = Self {
            prefixes: HashMap::new(),
        };

        mgr.add_prefix("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#");
        mgr.add_prefix("rdfs", "http://www.w3.org/2000/01/rdf-schema#");
        mgr.add_prefix("xsd", "http://www.w3.org/2001/XMLSchema#");
        mgr.add_prefix("owl", "http://www.w3.org/2002/07/owl#");
        mgr.add_prefix("foaf", "http://xmlns.com/foaf/0.1/");
        mgr.add_prefix("dc", "http://purl.org/dc/elements/1.1/");
        mgr.add_prefix("dcterms", "http://purl.org/dc/terms/");
        mgr.add_prefix("schema", "http://schema.org/");
        mgr.add_prefix("ldp", "http://www.w3.org/ns/ldp#");

        mgr
    }

    /// Add a prefix
    pub fn add_prefix(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.prefixes.insert(prefix.into(), iri.into());
    }

    /// Get IRI for a prefix
    pub fn get_iri(&self, prefix: &str) -> PrefixResult<&str> {
        self.prefixes
            .get(prefix)
            .map(|s| s.as_str())
            .ok_or_else(|| PrefixError::UnknownPrefix(prefix.to_string()))
    }

    /// Expand a compact IRI (prefix:local) to full IRI
    pub fn expand(&self, compact_iri: &str) -> PrefixResult<String> {
        if let Some(pos) = compact_iri.find(':') {
            let prefix = &compact_iri[..pos];
            let local = &compact_iri[pos + 1..];
            let iri = self.get_iri(prefix)?;
            Ok(format!("{}{}", iri, local))
        } else {
            Err(PrefixError::InvalidIri(compact_iri.to_string()))
        }
    }

    /// Expand a compact IRI when its prefix is known, otherwise return it unchanged.
    ///
    /// Absolute IRIs (`http://...`, `urn:...`) pass through because their
    /// scheme is never registered as a prefix.
    pub fn expand_or_keep(&self, iri: &str) -> String {
        match iri.find(':') {
            Some(pos) if !iri[pos + 1..].starts_with("//") => {
                self.expand(iri).unwrap_or_else(|_| iri.to_string())
            }
            _ => iri.to_string(),
        }
    }

    /// Compact an IRI using known prefixes, preferring the longest namespace
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.prefixes
            .iter()
            .filter(|(_, namespace_iri)| iri.starts_with(namespace_iri.as_str()))
            .max_by_key(|(_, namespace_iri)| namespace_iri.len())
            .map(|(prefix, namespace_iri)| format!("{}:{}", prefix, &iri[namespace_iri.len()..]))
    }
}

impl Default for NamespaceManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Local part of an IRI: whatever follows the last `#` or `/`
pub fn local_name(iri: &str) -> &str {
    let trimmed = iri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['#', '/', ':']) {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefixes() {
        let mgr = NamespaceManager::new();

        assert_eq!(
            mgr.get_iri("rdf").unwrap(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#"
        );
        assert_eq!(mgr.get_iri("xsd").unwrap(), "http://www.w3.org/2001/XMLSchema#");
        assert!(mgr.get_iri("nope").is_err());
    }

    #[test]
    fn test_expand() {
        let mgr = NamespaceManager::new();

        let expanded = mgr.expand("foaf:name").unwrap();
        assert_eq!(expanded, "http://xmlns.com/foaf/0.1/name");
        assert!(mgr.expand("name").is_err());
    }

    #[test]
    fn test_expand_or_keep() {
        let mut mgr = NamespaceManager::new();
        mgr.add_prefix("ex", "http://example.org/");

        assert_eq!(mgr.expand_or_keep("ex:alice"), "http://example.org/alice");
        assert_eq!(
            mgr.expand_or_keep("http://example.org/bob"),
            "http://example.org/bob"
        );
        assert_eq!(mgr.expand_or_keep("urn:uuid:1"), "urn:uuid:1");
    }

    #[test]
    fn test_compact() {
        let mgr = NamespaceManager::new();

        let compacted = mgr.compact("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
        assert_eq!(compacted, Some("rdf:type".to_string()));
        assert_eq!(mgr.compact("http://unknown.example/x"), None);
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("http://xmlns.com/foaf/0.1/name"), "name");
        assert_eq!(local_name(rdf::TYPE.as_str()), "type");
        assert_eq!(local_name("http://example.org/Person/"), "Person");
        assert_eq!(local_name("urn:thing"), "thing");
    }
}
