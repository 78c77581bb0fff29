//! Registry of bindings, keyed by configuration key
//!
//! One key fans out to any number of bindings, kept in registration order.
//! All access goes through a single lock: inserts take it exclusively,
//! lookups share it and copy the `Arc`s out, so bindings are always applied
//! with the lock released.

use crate::binding::{Binding, owner_addr};
use crate::sync::RwLockExt;
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Concurrent ordered multimap from configuration key to bindings
///
/// Usually one instance per process, shared as `Arc<BindingRegistry>`
/// between discovery and dispatch.
#[derive(Default)]
pub struct BindingRegistry {
    entries: RwLock<HashMap<String, Vec<Arc<Binding>>>>,
}

impl BindingRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding under its key
    ///
    /// Duplicates are kept; registering the same member twice makes it
    /// receive every update twice.
    pub fn register(&self, binding: Binding) -> Arc<Binding> {
        let binding = Arc::new(binding);
        self.entries
            .write_recovered()
            .entry(binding.key().to_string())
            .or_default()
            .push(Arc::clone(&binding));
        info!("Listening on key={} for {}", binding.key(), binding.display_name());
        binding
    }

    /// Register several bindings while holding the lock once
    ///
    /// Other threads observe either none or all of them.
    pub fn register_all(&self, bindings: impl IntoIterator<Item = Binding>) -> Vec<Arc<Binding>> {
        let bindings: Vec<Arc<Binding>> = bindings.into_iter().map(Arc::new).collect();
        {
            let mut entries = self.entries.write_recovered();
            for binding in &bindings {
                entries
                    .entry(binding.key().to_string())
                    .or_default()
                    .push(Arc::clone(binding));
            }
        }
        for binding in &bindings {
            info!("Listening on key={} for {}", binding.key(), binding.display_name());
        }
        bindings
    }

    /// Bindings registered under `key`, in registration order
    #[must_use]
    pub fn bindings_for(&self, key: &str) -> Vec<Arc<Binding>> {
        self.entries
            .read_recovered()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any binding listens on `key`
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read_recovered().contains_key(key)
    }

    /// All keys with at least one binding, sorted
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read_recovered().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total number of bindings across all keys
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read_recovered().values().map(Vec::len).sum()
    }

    /// Whether the registry holds no bindings
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read_recovered().is_empty()
    }

    /// Remove every binding that writes into `owner`
    ///
    /// Returns the number of bindings removed.
    pub fn deregister_owner<T>(&self, owner: &Arc<RwLock<T>>) -> usize {
        let addr = owner_addr(owner);
        let removed = self.retain(|binding| binding.owner_addr() != addr);
        if removed > 0 {
            info!("Deregistered {removed} binding(s) of {}", std::any::type_name::<T>());
        }
        removed
    }

    /// Remove every binding whose owner has been dropped
    ///
    /// Returns the number of bindings removed.
    pub fn prune(&self) -> usize {
        let removed = self.retain(|binding| binding.is_alive());
        if removed > 0 {
            debug!("Pruned {removed} binding(s) of dropped owners");
        }
        removed
    }

    /// Remove all bindings
    pub fn clear(&self) {
        self.entries.write_recovered().clear();
    }

    fn retain(&self, keep: impl Fn(&Binding) -> bool) -> usize {
        let mut entries = self.entries.write_recovered();
        let mut removed = 0;
        entries.retain(|_, bindings| {
            let before = bindings.len();
            bindings.retain(|b| keep(&**b));
            removed += before - bindings.len();
            !bindings.is_empty()
        });
        removed
    }
}

impl std::fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("keys", &self.keys().len())
            .field("bindings", &self.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
