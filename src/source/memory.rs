//! In-process configuration namespaces
//!
//! Properties live in memory; every mutation is diffed against the previous
//! state and delivered to listeners as a single [`ChangeEvent`].

use super::file::PropertiesFormat;
use super::{
    ChangeEvent, ChangeListener, Config, ConfigChange, ConfigHandle, ConfigService, ListenerId,
};
use crate::error::Result;
use crate::sync::RwLockExt;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A single in-memory namespace
pub struct MemoryConfig {
    namespace: String,
    properties: RwLock<BTreeMap<String, String>>,
    listeners: RwLock<Vec<(ListenerId, ChangeListener)>>,
    next_listener: AtomicU64,
}

impl MemoryConfig {
    /// Create an empty namespace
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            properties: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Set a property, notifying listeners if the value changed
    ///
    /// Returns the event that was delivered, if any.
    pub fn set_property(&self, key: &str, value: impl Into<String>) -> Option<ChangeEvent> {
        let value = value.into();
        let change = {
            let mut props = self.properties.write_recovered();
            let old = props.insert(key.to_string(), value.clone());
            ConfigChange::between(key, old, Some(value))
        };
        self.publish(change.into_iter().collect())
    }

    /// Remove a property, notifying listeners if it was set
    pub fn remove_property(&self, key: &str) -> Option<ChangeEvent> {
        let change = {
            let mut props = self.properties.write_recovered();
            let old = props.remove(key);
            ConfigChange::between(key, old, None)
        };
        self.publish(change.into_iter().collect())
    }

    /// Replace every property at once
    ///
    /// Keys missing from `properties` are deleted. Listeners receive one
    /// event covering all differences.
    pub fn replace_all(&self, properties: BTreeMap<String, String>) -> Option<ChangeEvent> {
        let changes = {
            let mut props = self.properties.write_recovered();
            let keys: BTreeSet<String> = props.keys().chain(properties.keys()).cloned().collect();
            let changes: Vec<ConfigChange> = keys
                .into_iter()
                .filter_map(|key| {
                    let old = props.get(&key).cloned();
                    let new = properties.get(&key).cloned();
                    ConfigChange::between(key, old, new)
                })
                .collect();
            *props = properties;
            changes
        };
        self.publish(changes)
    }

    /// Reload the namespace from a properties file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed. The current
    /// properties are kept in that case.
    pub fn reload_from_file<F: PropertiesFormat>(
        &self,
        path: &Path,
        format: &F,
    ) -> Result<Option<ChangeEvent>> {
        let properties = format.read(path)?;
        info!(
            "Reloading namespace '{}' from {} ({} properties)",
            self.namespace,
            path.display(),
            properties.len()
        );
        Ok(self.replace_all(properties))
    }

    /// Snapshot of all properties
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.properties.read_recovered().clone()
    }

    /// Number of registered change listeners
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read_recovered().len()
    }

    fn publish(&self, changes: Vec<ConfigChange>) -> Option<ChangeEvent> {
        if changes.is_empty() {
            return None;
        }
        let event = ChangeEvent::new(self.namespace.clone(), changes);

        // Snapshot so listeners may add or remove listeners
        let listeners: Vec<ChangeListener> = self
            .listeners
            .read_recovered()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        debug!(
            "Publishing {} change(s) in namespace '{}' to {} listener(s)",
            event.len(),
            self.namespace,
            listeners.len()
        );
        for listener in &listeners {
            listener(&event);
        }
        Some(event)
    }
}

impl ConfigHandle for MemoryConfig {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn property(&self, key: &str) -> Option<String> {
        self.properties.read_recovered().get(key).cloned()
    }

    fn property_names(&self) -> Vec<String> {
        self.properties.read_recovered().keys().cloned().collect()
    }

    fn add_change_listener(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId::new(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.write_recovered().push((id, listener));
        id
    }

    fn remove_change_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write_recovered();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        let removed = listeners.len() < before;
        if removed {
            debug!("Removed change listener {} from namespace '{}'", id.get(), self.namespace);
        }
        removed
    }
}

/// [`ConfigService`] backed by [`MemoryConfig`] namespaces
///
/// Namespaces are created on first access and live as long as the service.
#[derive(Default)]
pub struct MemoryConfigService {
    namespaces: RwLock<HashMap<String, Arc<MemoryConfig>>>,
}

impl MemoryConfigService {
    /// Create a service with no namespaces
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed access to a namespace, creating it if needed
    pub fn namespace(&self, namespace: &str) -> Arc<MemoryConfig> {
        if let Some(existing) = self.namespaces.read_recovered().get(namespace) {
            return Arc::clone(existing);
        }
        let mut namespaces = self.namespaces.write_recovered();
        Arc::clone(
            namespaces
                .entry(namespace.to_string())
                .or_insert_with(|| Arc::new(MemoryConfig::new(namespace))),
        )
    }

    /// Names of all namespaces created so far
    #[must_use]
    pub fn namespace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read_recovered().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ConfigService for MemoryConfigService {
    fn config(&self, namespace: &str) -> Config {
        self.namespace(namespace)
    }
}

// =============================================================================
// Tests
// =============================================================================
