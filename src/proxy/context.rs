//! Alias tables
//!
//! An `LdoContext` holds one `ShapeContext` per shape label; each maps a
//! property alias to the predicate, value kind and cardinality a proxy uses
//! for it. Lookup is an explicit table dispatch done before every read and
//! write.
//!
//! Wire format (JSON or YAML):
//!
//! ```json
//! {
//!   "@prefixes": { "ex": "http://example.org/" },
//!   "ex:Person": {
//!     "name":  { "predicate": "foaf:name", "valueKind": "literal", "datatype": "xsd:string" },
//!     "knows": { "predicate": "foaf:knows", "valueKind": "object", "cardinality": "set", "shape": "ex:Person" }
//!   }
//! }
//! ```

use super::{ProxyError, ProxyResult};
use crate::config::{ConfigError, ConfigResult};
use crate::rdf::namespace::NamespaceManager;
use crate::rdf::{NamedNode, RdfPredicate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Whether a property holds literals or nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Literal,
    Object,
}

/// How many values a property holds and how they are arranged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    Set,
    List,
}

/// Resolved definition of one alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub predicate: RdfPredicate,
    pub kind: ValueKind,
    pub cardinality: Cardinality,
    /// Datatype literals are written with
    pub datatype: Option<NamedNode>,
    /// Language tag literals are read and written with
    pub language: Option<String>,
    /// Property points from the value to the subject
    pub inverse: bool,
    /// Shape label of nested objects, resolved lazily on access
    pub shape: Option<String>,
}

impl ContextEntry {
    /// Single-valued literal property
    pub fn literal(predicate: RdfPredicate) -> Self {
        Self {
            predicate,
            kind: ValueKind::Literal,
            cardinality: Cardinality::Single,
            datatype: None,
            language: None,
            inverse: false,
            shape: None,
        }
    }

    /// Single-valued object property
    pub fn object(predicate: RdfPredicate) -> Self {
        Self {
            kind: ValueKind::Object,
            ..Self::literal(predicate)
        }
    }

    pub fn with_datatype(mut self, datatype: NamedNode) -> Self {
        self.datatype = Some(datatype);
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn inverted(mut self) -> Self {
        self.inverse = true;
        self
    }

    fn from_raw(raw: RawEntry, namespaces: &NamespaceManager) -> ConfigResult<Self> {
        let predicate = RdfPredicate::new(&namespaces.expand_or_keep(&raw.predicate))?;
        let datatype = raw
            .datatype
            .map(|d| NamedNode::new(&namespaces.expand_or_keep(&d)))
            .transpose()?;
        if raw.value_kind == ValueKind::Object && (datatype.is_some() || raw.language.is_some()) {
            return Err(ConfigError::InvalidContext(format!(
                "object property {} cannot carry a datatype or language",
                raw.predicate
            )));
        }
        Ok(Self {
            predicate,
            kind: raw.value_kind,
            cardinality: raw.cardinality,
            datatype,
            language: raw.language,
            inverse: raw.inverse,
            shape: raw.shape.map(|s| namespaces.expand_or_keep(&s)),
        })
    }

    fn to_raw(&self) -> RawEntry {
        RawEntry {
            predicate: self.predicate.as_str().to_string(),
            value_kind: self.kind,
            cardinality: self.cardinality,
            datatype: self.datatype.as_ref().map(|d| d.as_str().to_string()),
            language: self.language.clone(),
            inverse: self.inverse,
            shape: self.shape.clone(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Serialized form of an entry
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntry {
    predicate: String,
    #[serde(default)]
    value_kind: ValueKind,
    #[serde(default)]
    cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    inverse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    shape: Option<String>,
}

/// Alias table of one shape
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeContext {
    entries: IndexMap<String, ContextEntry>,
}

impl ShapeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an alias, returning the previous entry
    pub fn insert(&mut self, alias: impl Into<String>, entry: ContextEntry) -> Option<ContextEntry> {
        self.entries.insert(alias.into(), entry)
    }

    pub fn get(&self, alias: &str) -> Option<&ContextEntry> {
        self.entries.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Aliases in declaration order
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextEntry)> {
        self.entries.iter().map(|(alias, entry)| (alias.as_str(), entry))
    }

    /// Alias bound to a predicate in the given direction
    pub fn alias_for(&self, predicate: &RdfPredicate, inverse: bool) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| &e.predicate == predicate && e.inverse == inverse)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Alias tables for every shape of a schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdoContext {
    shapes: IndexMap<String, ShapeContext>,
}

impl LdoContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the table of a shape
    pub fn insert_shape(&mut self, label: impl Into<String>, context: ShapeContext) {
        self.shapes.insert(label.into(), context);
    }

    pub fn shape(&self, label: &str) -> Option<&ShapeContext> {
        self.shapes.get(label)
    }

    pub fn shape_labels(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Check that a shape label is known
    pub fn require_shape(&self, label: &str) -> ProxyResult<&ShapeContext> {
        self.shapes
            .get(label)
            .ok_or_else(|| ProxyError::UnknownShape(label.to_string()))
    }

    /// Resolve an alias.
    ///
    /// With a shape, only that shape's table is consulted. Without one, the
    /// first shape defining the alias wins.
    pub fn resolve(&self, shape: Option<&str>, alias: &str) -> ProxyResult<&ContextEntry> {
        let found = match shape {
            Some(label) => self.require_shape(label)?.get(alias),
            None => self.shapes.values().find_map(|s| s.get(alias)),
        };
        found.ok_or_else(|| ProxyError::UnknownAlias {
            alias: alias.to_string(),
            shape: shape.map(str::to_string),
        })
    }

    /// Aliases visible through a shape, or through every shape when `None`
    pub fn aliases(&self, shape: Option<&str>) -> Vec<&str> {
        match shape {
            Some(label) => self
                .shapes
                .get(label)
                .map(|s| s.aliases().collect())
                .unwrap_or_default(),
            None => {
                let mut aliases: Vec<&str> = Vec::new();
                for context in self.shapes.values() {
                    for alias in context.aliases() {
                        if !aliases.contains(&alias) {
                            aliases.push(alias);
                        }
                    }
                }
                aliases
            }
        }
    }

    /// Load a context from JSON text
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load a context from YAML text
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        Self::from_value(serde_yaml::from_str(yaml)?)
    }

    /// Load a context from a JSON value, expanding compact IRIs
    pub fn from_value(value: JsonValue) -> ConfigResult<Self> {
        let mut tables: IndexMap<String, JsonValue> = serde_json::from_value(value)?;

        let mut namespaces = NamespaceManager::new();
        if let Some(prefixes) = tables.shift_remove("@prefixes") {
            let prefixes: IndexMap<String, String> = serde_json::from_value(prefixes)?;
            for (prefix, iri) in prefixes {
                namespaces.add_prefix(prefix, iri);
            }
        }

        let mut context = Self::new();
        for (label, table) in tables {
            let raw: IndexMap<String, RawEntry> = serde_json::from_value(table)?;
            let mut shape = ShapeContext::new();
            for (alias, entry) in raw {
                shape.insert(alias, ContextEntry::from_raw(entry, &namespaces)?);
            }
            context.insert_shape(namespaces.expand_or_keep(&label), shape);
        }
        Ok(context)
    }

    /// Render as JSON with full IRIs
    pub fn to_value(&self) -> ConfigResult<JsonValue> {
        let tables: IndexMap<&str, IndexMap<&str, RawEntry>> = self
            .shapes
            .iter()
            .map(|(label, shape)| {
                let entries = shape.iter().map(|(alias, e)| (alias, e.to_raw())).collect();
                (label.as_str(), entries)
            })
            .collect();
        Ok(serde_json::to_value(tables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: &str = r#"{
        "@prefixes": { "ex": "http://example.org/" },
        "ex:Person": {
            "name": { "predicate": "foaf:name", "valueKind": "literal", "datatype": "xsd:string" },
            "knows": { "predicate": "foaf:knows", "valueKind": "object", "cardinality": "set", "shape": "ex:Person" },
            "memberOf": { "predicate": "ex:member", "valueKind": "object", "inverse": true }
        }
    }"#;

    #[test]
    fn test_load_and_resolve() {
        let context = LdoContext::from_json(CONTEXT).unwrap();
        let shape = "http://example.org/Person";

        let name = context.resolve(Some(shape), "name").unwrap();
        assert_eq!(name.predicate.as_str(), "http://xmlns.com/foaf/0.1/name");
        assert_eq!(name.kind, ValueKind::Literal);
        assert_eq!(name.cardinality, Cardinality::Single);
        assert_eq!(
            name.datatype.as_ref().map(|d| d.as_str()),
            Some("http://www.w3.org/2001/XMLSchema#string")
        );

        let knows = context.resolve(Some(shape), "knows").unwrap();
        assert_eq!(knows.cardinality, Cardinality::Set);
        assert_eq!(knows.shape.as_deref(), Some(shape));

        assert!(context.resolve(Some(shape), "memberOf").unwrap().inverse);
    }

    #[test]
    fn test_resolve_errors() {
        let context = LdoContext::from_json(CONTEXT).unwrap();
        assert!(matches!(
            context.resolve(Some("http://example.org/Nope"), "name"),
            Err(ProxyError::UnknownShape(_))
        ));
        assert!(matches!(
            context.resolve(None, "age"),
            Err(ProxyError::UnknownAlias { .. })
        ));
        assert!(context.resolve(None, "name").is_ok());
    }

    #[test]
    fn test_yaml_matches_json() {
        let yaml = r#"
"@prefixes":
  ex: "http://example.org/"
"ex:Person":
  name:
    predicate: "foaf:name"
  knows:
    predicate: "foaf:knows"
    valueKind: object
    cardinality: set
    shape: "ex:Person"
"#;
        let context = LdoContext::from_yaml(yaml).unwrap();
        let knows = context.resolve(None, "knows").unwrap();
        assert_eq!(knows.kind, ValueKind::Object);
        assert_eq!(context.aliases(None), vec!["name", "knows"]);
    }

    #[test]
    fn test_object_with_datatype_is_rejected() {
        let json = r#"{ "S": { "x": { "predicate": "http://example.org/x", "valueKind": "object", "datatype": "xsd:string" } } }"#;
        assert!(matches!(
            LdoContext::from_json(json),
            Err(ConfigError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_value_roundtrip() {
        let context = LdoContext::from_json(CONTEXT).unwrap();
        let value = context.to_value().unwrap();
        let reloaded = LdoContext::from_value(value).unwrap();
        assert_eq!(context, reloaded);
    }

    #[test]
    fn test_alias_for_predicate() {
        let context = LdoContext::from_json(CONTEXT).unwrap();
        let shape = context.shape("http://example.org/Person").unwrap();
        let knows = RdfPredicate::new("http://xmlns.com/foaf/0.1/knows").unwrap();
        assert_eq!(shape.alias_for(&knows, false), Some("knows"));
        assert_eq!(shape.alias_for(&knows, true), None);
    }
}
