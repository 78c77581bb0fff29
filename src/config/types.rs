//! Core types for binder configuration

use crate::error::{Error, Result};
use crate::expression::ExpressionMatcher;

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "application";

/// Configuration for a [`ValueBinder`](crate::ValueBinder)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    /// Namespaces watched for auto-update and searched for initial values,
    /// in lookup order
    pub namespaces: Vec<String>,

    /// Dispatch change events from the watched namespaces automatically
    pub auto_update: bool,

    /// Remove bindings of dropped owners when a dispatch runs into one
    pub prune_released_owners: bool,

    /// Refuse to register setter methods that can never be applied
    /// Default: false (they are registered and fail on every update)
    pub reject_invalid_setters: bool,

    /// Apply the current value (or the expression default) right after binding
    pub inject_initial_values: bool,

    /// Custom placeholder pattern; group 1 is the key, group 2 the default
    /// If None, `\$\{(.*)\}:?(.*)` is used
    pub value_pattern: Option<String>,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            namespaces: vec![DEFAULT_NAMESPACE.to_string()],
            auto_update: true,
            prune_released_owners: true,
            reject_invalid_setters: false,
            inject_initial_values: false,
            value_pattern: None,
        }
    }
}

impl BinderConfig {
    /// Create a new builder for BinderConfig
    ///
    /// # Example
    /// ```rust
    /// use confbind::BinderConfig;
    ///
    /// let config = BinderConfig::builder()
    ///     .namespace("application")
    ///     .namespace("datasource")
    ///     .inject_initial_values(true)
    ///     .build();
    ///
    /// assert_eq!(config.namespaces, vec!["application", "datasource"]);
    /// ```
    #[must_use]
    pub fn builder() -> BinderConfigBuilder {
        BinderConfigBuilder::new()
    }

    /// Check the configuration for consistency
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] for an empty or duplicated namespace
    /// - [`Error::InvalidExpressionPattern`] if `value_pattern` is unusable
    pub fn validate(&self) -> Result<()> {
        for (i, namespace) in self.namespaces.iter().enumerate() {
            if namespace.trim().is_empty() {
                return Err(Error::Config("namespace names must not be empty".into()));
            }
            if self.namespaces[..i].contains(namespace) {
                return Err(Error::Config(format!("namespace '{namespace}' listed twice")));
            }
        }
        self.matcher().map(|_| ())
    }

    /// Expression matcher for this configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExpressionPattern`] for a bad custom pattern.
    pub fn matcher(&self) -> Result<ExpressionMatcher> {
        match &self.value_pattern {
            Some(pattern) => ExpressionMatcher::new(pattern),
            None => Ok(ExpressionMatcher::standard()),
        }
    }
}

/// Builder for creating BinderConfig with a fluent API
#[derive(Debug, Clone, Default)]
pub struct BinderConfigBuilder {
    namespaces: Vec<String>,
    auto_update: Option<bool>,
    prune_released_owners: Option<bool>,
    reject_invalid_setters: bool,
    inject_initial_values: bool,
    value_pattern: Option<String>,
}

impl BinderConfigBuilder {
    /// Create a new builder with default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch an additional namespace
    ///
    /// The first call replaces the default `application` namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }

    /// Watch exactly these namespaces
    #[must_use]
    pub fn namespaces<I, S>(mut self, namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespaces = namespaces.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable automatic dispatch of change events (default: enabled)
    #[must_use]
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = Some(enabled);
        self
    }

    /// Enable or disable pruning of dropped owners (default: enabled)
    #[must_use]
    pub fn prune_released_owners(mut self, enabled: bool) -> Self {
        self.prune_released_owners = Some(enabled);
        self
    }

    /// Refuse setter methods that can never be applied (default: disabled)
    #[must_use]
    pub fn reject_invalid_setters(mut self, reject: bool) -> Self {
        self.reject_invalid_setters = reject;
        self
    }

    /// Apply current values right after binding (default: disabled)
    #[must_use]
    pub fn inject_initial_values(mut self, enabled: bool) -> Self {
        self.inject_initial_values = enabled;
        self
    }

    /// Use a custom placeholder pattern
    ///
    /// The pattern is matched against the whole expression. Group 1 must
    /// capture the key; an optional group 2 captures the default.
    #[must_use]
    pub fn value_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.value_pattern = Some(pattern.into());
        self
    }

    /// Build the BinderConfig
    ///
    /// Nothing is validated here; see [`BinderConfig::validate`].
    #[must_use]
    pub fn build(self) -> BinderConfig {
        let defaults = BinderConfig::default();
        BinderConfig {
            namespaces: if self.namespaces.is_empty() {
                defaults.namespaces
            } else {
                self.namespaces
            },
            auto_update: self.auto_update.unwrap_or(defaults.auto_update),
            prune_released_owners: self
                .prune_released_owners
                .unwrap_or(defaults.prune_released_owners),
            reject_invalid_setters: self.reject_invalid_setters,
            inject_initial_values: self.inject_initial_values,
            value_pattern: self.value_pattern,
        }
    }
}
