//! Configuration sources and change notification
//!
//! The binding machinery does not fetch configuration itself. It talks to a
//! [`ConfigService`] that hands out one [`ConfigHandle`] per namespace, and
//! each handle delivers [`ChangeEvent`]s to registered listeners.
//!
//! [`MemoryConfigService`] is the in-process implementation; it can be fed
//! programmatically or reloaded from JSON/TOML/YAML files (see [`file`]).

pub mod file;
mod memory;

pub use file::{JsonFormat, PropertiesFormat, flatten};
#[cfg(feature = "toml")]
pub use file::TomlFormat;
#[cfg(feature = "yaml")]
pub use file::YamlFormat;
pub use memory::{MemoryConfig, MemoryConfigService};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every change event of a namespace
pub type ChangeListener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Shared handle to one configuration namespace
pub type Config = Arc<dyn ConfigHandle>;

/// Identifies a change listener within the namespace it was added to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw identifier handed out by a [`ConfigHandle`]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw identifier
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One configuration namespace
pub trait ConfigHandle: Send + Sync {
    /// Namespace name
    fn namespace(&self) -> &str;

    /// Current value of a property
    fn property(&self, key: &str) -> Option<String>;

    /// Names of all properties currently set
    fn property_names(&self) -> Vec<String>;

    /// Register a listener for future change events
    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId;

    /// Unregister a listener
    ///
    /// Returns `false` if `id` is not registered on this namespace. An event
    /// already being delivered may still reach the listener.
    fn remove_change_listener(&self, id: ListenerId) -> bool;

    /// Current value of a property, or `default` when unset
    fn property_or(&self, key: &str, default: &str) -> String {
        self.property(key).unwrap_or_else(|| default.to_string())
    }
}

impl fmt::Debug for dyn ConfigHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigHandle")
            .field("namespace", &self.namespace())
            .finish_non_exhaustive()
    }
}

/// Hands out configuration namespaces
pub trait ConfigService: Send + Sync {
    /// Get (or lazily create) the handle for a namespace
    fn config(&self, namespace: &str) -> Config;
}

/// Kind of change a property went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
}

/// Change of a single property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub property_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_type: ChangeType,
}

impl ConfigChange {
    /// Compute the change between two values of a property
    ///
    /// Returns `None` if nothing changed.
    #[must_use]
    pub fn between(
        property_name: impl Into<String>,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Option<Self> {
        let change_type = match (&old_value, &new_value) {
            (None, None) => return None,
            (None, Some(_)) => ChangeType::Added,
            (Some(_), None) => ChangeType::Deleted,
            (Some(old), Some(new)) if old == new => return None,
            (Some(_), Some(_)) => ChangeType::Modified,
        };
        Some(Self {
            property_name: property_name.into(),
            old_value,
            new_value,
            change_type,
        })
    }
}

/// A batch of property changes in one namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    namespace: String,
    changes: BTreeMap<String, ConfigChange>,
}

impl ChangeEvent {
    /// Create an event from individual changes
    pub fn new(namespace: impl Into<String>, changes: impl IntoIterator<Item = ConfigChange>) -> Self {
        Self {
            namespace: namespace.into(),
            changes: changes
                .into_iter()
                .map(|c| (c.property_name.clone(), c))
                .collect(),
        }
    }

    /// Namespace the changes belong to
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Keys changed by this event, in key order
    pub fn changed_keys(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Whether a key is part of this event
    #[must_use]
    pub fn is_changed(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    /// Full change record of a key
    #[must_use]
    pub fn get_change(&self, key: &str) -> Option<&ConfigChange> {
        self.changes.get(key)
    }

    /// New value of a key (`None` if deleted or not part of the event)
    #[must_use]
    pub fn new_value(&self, key: &str) -> Option<&str> {
        self.changes.get(key).and_then(|c| c.new_value.as_deref())
    }

    /// All change records, in key order
    pub fn changes(&self) -> impl Iterator<Item = &ConfigChange> {
        self.changes.values()
    }

    /// Number of changed keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the event carries no changes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
