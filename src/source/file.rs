//! Properties file formats
//!
//! A properties file is any nested document (JSON, TOML, YAML). It is
//! flattened into dotted keys so it can feed a [`MemoryConfig`]:
//!
//! ```text
//! { "server": { "port": 8080, "hosts": ["a", "b"] } }
//!   => server.port = "8080", server.hosts[0] = "a", server.hosts[1] = "b"
//! ```
//!
//! [`MemoryConfig`]: super::MemoryConfig

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Trait for properties file formats
///
/// This allows swapping JSON for TOML, YAML, or other formats.
pub trait PropertiesFormat: Send + Sync {
    /// File extension for this format (e.g., "json", "toml")
    fn extension(&self) -> &str;

    /// Parse a document into a JSON value tree
    fn parse(&self, content: &str) -> Result<Value>;

    /// Parse and flatten a document into dotted properties
    fn properties(&self, content: &str) -> Result<BTreeMap<String, String>> {
        let tree = self.parse(content)?;
        if !tree.is_object() {
            return Err(Error::Parse(format!(
                "{} document root must be a table/object",
                self.extension()
            )));
        }
        Ok(flatten(&tree))
    }

    /// Read, parse and flatten a file
    fn read(&self, path: &Path) -> Result<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;
        self.properties(&content)
    }
}

/// Flatten a value tree into dotted keys
///
/// Strings are taken verbatim, numbers and booleans via their JSON text,
/// `null` entries are skipped. A scalar root yields a single entry under the
/// empty key.
#[must_use]
pub fn flatten(tree: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_into(String::new(), tree, &mut out);
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(path, child, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(format!("{prefix}[{i}]"), child, out);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            out.insert(prefix, s.clone());
        }
        Value::Bool(_) | Value::Number(_) => {
            out.insert(prefix, value.to_string());
        }
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// JSON properties format (default)
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormat;

impl PropertiesFormat for JsonFormat {
    fn extension(&self) -> &str {
        "json"
    }

    fn parse(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content).map_err(Error::from)
    }
}

// =============================================================================
// TOML Format
// =============================================================================

/// TOML properties format
#[cfg(feature = "toml")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TomlFormat;

#[cfg(feature = "toml")]
impl PropertiesFormat for TomlFormat {
    fn extension(&self) -> &str {
        "toml"
    }

    fn parse(&self, content: &str) -> Result<Value> {
        toml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// YAML Format
// =============================================================================

/// YAML properties format
#[cfg(feature = "yaml")]
#[derive(Clone, Copy, Debug, Default)]
pub struct YamlFormat;

#[cfg(feature = "yaml")]
impl PropertiesFormat for YamlFormat {
    fn extension(&self) -> &str {
        "yaml"
    }

    fn parse(&self, content: &str) -> Result<Value> {
        serde_yaml::from_str(content).map_err(|e| Error::Parse(e.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
