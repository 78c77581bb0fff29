//! Builder for ValueBinder
//!
//! This module contains [`ValueBinderBuilder`] which provides a fluent API
//! for creating a [`ValueBinder`](super::ValueBinder).

use crate::config::BinderConfigBuilder;
use crate::error::Result;
use crate::source::ConfigService;
use std::sync::Arc;

use super::ValueBinder;

/// Builder for creating a [`ValueBinder`] with a fluent API.
///
/// # Example
///
/// ```rust
/// use confbind::{MemoryConfigService, ValueBinder};
/// use std::sync::Arc;
///
/// let service = Arc::new(MemoryConfigService::new());
/// let binder = ValueBinder::builder(service)
///     .namespace("application")
///     .namespace("datasource")
///     .inject_initial_values(true)
///     .build()
///     .unwrap();
///
/// assert!(binder.registry().is_empty());
/// ```
pub struct ValueBinderBuilder {
    service: Arc<dyn ConfigService>,
    config_builder: BinderConfigBuilder,
}

impl ValueBinderBuilder {
    /// Create a new builder over a configuration service.
    pub fn new(service: Arc<dyn ConfigService>) -> Self {
        Self {
            service,
            config_builder: BinderConfigBuilder::new(),
        }
    }

    /// Watch an additional namespace.
    ///
    /// The first call replaces the default `application` namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.namespace(namespace);
        self
    }

    /// Watch exactly these namespaces, in lookup order.
    #[must_use]
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config_builder = self.config_builder.namespaces(namespaces);
        self
    }

    /// Enable or disable automatic dispatch of change events.
    #[must_use]
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.auto_update(enabled);
        self
    }

    /// Enable or disable pruning of bindings whose owner was dropped.
    #[must_use]
    pub fn prune_released_owners(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.prune_released_owners(enabled);
        self
    }

    /// Refuse setter methods that can never be applied.
    #[must_use]
    pub fn reject_invalid_setters(mut self, reject: bool) -> Self {
        self.config_builder = self.config_builder.reject_invalid_setters(reject);
        self
    }

    /// Apply current values (or expression defaults) right after binding.
    #[must_use]
    pub fn inject_initial_values(mut self, enabled: bool) -> Self {
        self.config_builder = self.config_builder.inject_initial_values(enabled);
        self
    }

    /// Use a custom placeholder pattern.
    #[must_use]
    pub fn value_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.value_pattern(pattern);
        self
    }

    /// Build the [`ValueBinder`].
    ///
    /// With auto-update enabled this subscribes to every watched namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration does not validate.
    pub fn build(self) -> Result<ValueBinder> {
        ValueBinder::new(self.service, self.config_builder.build())
    }
}
