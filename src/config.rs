//! Proxy options
//!
//! Options are plain serde structs that load from YAML or JSON:
//!
//! ```yaml
//! write_graph: "http://example.org/doc"
//! read_graph: null
//! strict_literals: false
//! languages: ["@none", "en", "@other"]
//! ```

use crate::rdf::{PrefixError, RdfError, RdfGraph, RdfResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading options or contexts
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prefix error: {0}")]
    Prefix(#[from] PrefixError),

    #[error("Invalid term: {0}")]
    Rdf(#[from] RdfError),

    #[error("Invalid context: {0}")]
    InvalidContext(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Language key for untagged strings
pub const LANGUAGE_NONE: &str = "@none";
/// Language key matching any tag not listed explicitly
pub const LANGUAGE_OTHER: &str = "@other";

/// How proxies read and write the dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyOptions {
    /// Graph new quads go to; `None` is the default graph
    pub write_graph: Option<String>,
    /// Graph reads are limited to; `None` reads every graph
    pub read_graph: Option<String>,
    /// Fail on literals that cannot be coerced instead of falling back to
    /// their lexical form
    pub strict_literals: bool,
    /// Preference order when a property has several language variants
    pub languages: Vec<String>,
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self {
            write_graph: None,
            read_graph: None,
            strict_literals: false,
            languages: vec![
                LANGUAGE_NONE.to_string(),
                "en".to_string(),
                LANGUAGE_OTHER.to_string(),
            ],
        }
    }
}

impl ProxyOptions {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a `.yaml`/`.yml` or `.json` file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Graph writes target
    pub fn write_graph(&self) -> RdfResult<RdfGraph> {
        RdfGraph::parse(self.write_graph.as_deref())
    }

    /// Graph reads are scoped to, if any
    pub fn read_graph(&self) -> RdfResult<Option<RdfGraph>> {
        self.read_graph
            .as_deref()
            .map(|g| RdfGraph::parse(Some(g)))
            .transpose()
    }
}
