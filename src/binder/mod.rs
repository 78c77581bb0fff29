//! Main binder module
//!
//! This module contains the [`ValueBinder`] struct which is the primary entry
//! point: it owns a registry, discovers bindings on objects handed to it and
//! keeps them up to date with the watched configuration namespaces.

mod auto_update;
mod builder;

pub use builder::ValueBinderBuilder;

use crate::binding::{Bindable, Member};
use crate::config::BinderConfig;
use crate::discovery::{BindingProcessor, DiscoveryReport};
use crate::dispatcher::{DispatchReport, UpdateDispatcher};
use crate::error::Result;
use crate::registry::BindingRegistry;
use crate::source::{ChangeEvent, ConfigService};
use auto_update::AutoUpdateListener;
use log::{debug, info};
use std::sync::{Arc, RwLock};

/// Binds live objects to configuration and keeps them updated
///
/// # Example
///
/// ```rust
/// use confbind::{BindValue, Bindable, Member, MemoryConfigService, ValueBinder};
/// use std::sync::{Arc, RwLock};
///
/// #[derive(Default)]
/// struct Server {
///     port: i32,
/// }
///
/// impl Bindable for Server {
///     fn members() -> Vec<Member<Self>> {
///         vec![Member::field("port", i32::value_type(), |s: &mut Server, arg| {
///             s.port = i32::from_argument(arg)?;
///             Ok(())
///         })
///         .value("${server.port}:8080")]
///     }
/// }
///
/// let service = Arc::new(MemoryConfigService::new());
/// let binder = ValueBinder::builder(service.clone()).build()?;
///
/// let server = Arc::new(RwLock::new(Server::default()));
/// binder.bind(&server)?;
///
/// service.namespace("application").set_property("server.port", "9090");
/// assert_eq!(server.read().unwrap().port, 9090);
/// # Ok::<(), confbind::Error>(())
/// ```
pub struct ValueBinder {
    config: BinderConfig,
    service: Arc<dyn ConfigService>,
    registry: Arc<BindingRegistry>,
    dispatcher: Arc<UpdateDispatcher>,
    processor: BindingProcessor,
    updater: Arc<AutoUpdateListener>,
}

impl ValueBinder {
    /// Create a builder for `ValueBinder` with a fluent API.
    pub fn builder(service: Arc<dyn ConfigService>) -> ValueBinderBuilder {
        ValueBinderBuilder::new(service)
    }

    /// Create a binder with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(service: Arc<dyn ConfigService>, config: BinderConfig) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = Arc::new(
            UpdateDispatcher::new(Arc::clone(&registry))
                .prune_released_owners(config.prune_released_owners),
        );

        let mut processor = BindingProcessor::new(Arc::clone(&registry), Arc::clone(&service))
            .with_matcher(config.matcher()?)
            .reject_invalid_setters(config.reject_invalid_setters);
        if config.inject_initial_values {
            processor = processor.inject_initial_values(config.namespaces.clone());
        }

        let updater = Arc::new(AutoUpdateListener::new(
            Arc::clone(&dispatcher),
            Arc::clone(&service),
            config.namespaces.clone(),
        ));
        if config.auto_update {
            updater.install();
        } else {
            debug!("Auto-update disabled, changes must be dispatched manually");
        }

        info!(
            "Value binder ready (namespaces: {})",
            config.namespaces.join(", ")
        );

        Ok(Self {
            config,
            service,
            registry,
            dispatcher,
            processor,
            updater,
        })
    }

    /// Discover and register the bindings of `owner`
    ///
    /// Call once per object. The binder keeps only weak references; drop the
    /// object (or call [`unbind`](Self::unbind)) to stop updates.
    ///
    /// # Errors
    ///
    /// Returns a discovery error if a member is structurally invalid. Nothing
    /// is registered for `owner` in that case.
    pub fn bind<T: Bindable>(&self, owner: &Arc<RwLock<T>>) -> Result<DiscoveryReport> {
        self.processor.process(owner)
    }

    /// Discover and register an explicit member list for `owner`
    ///
    /// # Errors
    ///
    /// Same as [`bind`](Self::bind).
    pub fn bind_members<T: Send + Sync + 'static>(
        &self,
        owner: &Arc<RwLock<T>>,
        members: Vec<Member<T>>,
    ) -> Result<DiscoveryReport> {
        self.processor.process_members(owner, members)
    }

    /// Stop updating `owner`, returning the number of bindings removed
    ///
    /// The change listeners subscribed for `owner` are removed as well.
    pub fn unbind<T>(&self, owner: &Arc<RwLock<T>>) -> usize {
        let removed = self.registry.deregister_owner(owner);
        self.processor.unsubscribe_owner(owner);
        removed
    }

    /// Dispatch a change event by hand
    ///
    /// Useful with auto-update disabled. Values are resolved across the
    /// watched namespaces exactly as automatic updates are.
    pub fn on_change_event(&self, event: &ChangeEvent) -> Vec<DispatchReport> {
        self.updater.on_change(event)
    }

    /// Re-apply the current value of every bound key
    ///
    /// Keys missing from all watched namespaces fall back to their defaults.
    pub fn refresh(&self) -> Vec<DispatchReport> {
        self.registry
            .keys()
            .into_iter()
            .map(|key| match self.updater.resolve(&key) {
                Some(raw) => self.dispatcher.on_key_changed(&key, &raw),
                None => self.dispatcher.on_key_removed(&key),
            })
            .collect()
    }

    /// The binding registry
    #[must_use]
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// The update dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<UpdateDispatcher> {
        &self.dispatcher
    }

    /// The discovery processor
    #[must_use]
    pub fn processor(&self) -> &BindingProcessor {
        &self.processor
    }

    /// The configuration service
    #[must_use]
    pub fn service(&self) -> &Arc<dyn ConfigService> {
        &self.service
    }

    /// The binder configuration
    #[must_use]
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }
}

impl Drop for ValueBinder {
    fn drop(&mut self) {
        let updates = self.updater.uninstall();
        let listeners = self.processor.unsubscribe_all();
        debug!(
            "Value binder dropped, removed {updates} auto-update and {listeners} change listener(s)"
        );
    }
}

impl std::fmt::Debug for ValueBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValueBinder")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
