//! Discovering bindings on freshly constructed objects
//!
//! [`BindingProcessor`] walks the members of an object (fields first, then
//! methods, each in declaration order) and acts on their annotations:
//!
//! - `Value("${key}:default")` registers a [`Binding`] under `key`
//! - `Config(namespace)` injects the namespace handle once
//! - `ChangeListener(namespaces)` subscribes the method to change events
//!
//! Every member is validated before anything is registered, so a structural
//! error aborts discovery of that one object without leaving partial
//! registrations behind. If an injection is refused, namespaces already
//! injected into the object are withdrawn again.
//!
//! The processor remembers the listeners it subscribed for each owner;
//! [`BindingProcessor::unsubscribe_owner`] removes them again.

use crate::binding::{
    Accessor, Annotation, Argument, BindTarget, Bindable, Binding, Member, MemberKind, ValueType,
    owner_addr,
};
use crate::error::{Error, Result};
use crate::expression::ExpressionMatcher;
use crate::registry::BindingRegistry;
use crate::source::{ChangeEvent, Config, ConfigService, ListenerId};
use crate::sync::RwLockExt;
use log::{debug, error, info, warn};
use std::any::Any;
use std::sync::{Arc, RwLock, Weak};

/// What discovery did for one object
#[derive(Debug)]
pub struct DiscoveryReport {
    /// Fully qualified type name of the owner
    pub owner_type: &'static str,
    /// Registered bindings, in registration order
    pub bindings: Vec<Arc<Binding>>,
    /// Config namespaces injected into fields
    pub configs_injected: usize,
    /// Change listeners added (one per method and namespace)
    pub listeners: usize,
    /// Bindings given an initial value
    pub initialized: usize,
}

impl DiscoveryReport {
    /// Keys of the registered bindings, in registration order
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.key()).collect()
    }
}

struct Injection<T> {
    namespace: String,
    member: String,
    accessor: Accessor<T>,
}

struct Subscription<T> {
    namespaces: Vec<String>,
    member: String,
    accessor: Accessor<T>,
}

/// A change listener added on behalf of one owner
struct ListenerRegistration {
    owner: Weak<dyn Any + Send + Sync>,
    owner_addr: usize,
    config: Config,
    id: ListenerId,
}

impl ListenerRegistration {
    fn remove(&self) -> bool {
        self.config.remove_change_listener(self.id)
    }
}

/// Scans objects and registers their bindings
pub struct BindingProcessor {
    registry: Arc<BindingRegistry>,
    service: Arc<dyn ConfigService>,
    matcher: ExpressionMatcher,
    reject_invalid_setters: bool,
    initial_namespaces: Option<Vec<String>>,
    listeners: RwLock<Vec<ListenerRegistration>>,
}

impl BindingProcessor {
    /// Create a processor registering into `registry`
    ///
    /// `service` resolves namespaces for config injection and listeners.
    pub fn new(registry: Arc<BindingRegistry>, service: Arc<dyn ConfigService>) -> Self {
        Self {
            registry,
            service,
            matcher: ExpressionMatcher::standard(),
            reject_invalid_setters: false,
            initial_namespaces: None,
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Use a custom placeholder pattern
    #[must_use]
    pub fn with_matcher(mut self, matcher: ExpressionMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Skip setter methods that can never be applied instead of registering
    /// them as invalid bindings (default: register them)
    #[must_use]
    pub fn reject_invalid_setters(mut self, reject: bool) -> Self {
        self.reject_invalid_setters = reject;
        self
    }

    /// Apply each new binding once, with the key's current value from the
    /// first of `namespaces` that has it, else the expression default
    #[must_use]
    pub fn inject_initial_values(mut self, namespaces: Vec<String>) -> Self {
        self.initial_namespaces = Some(namespaces);
        self
    }

    /// The registry bindings are added to
    #[must_use]
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Number of change listeners currently subscribed by this processor
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.read_recovered().len()
    }

    /// Remove every change listener subscribed for `owner`
    ///
    /// Listeners of owners that have been dropped are removed as well.
    /// Returns the number of listeners removed for `owner`.
    pub fn unsubscribe_owner<T>(&self, owner: &Arc<RwLock<T>>) -> usize {
        let addr = owner_addr(owner);
        let (removed, _) = self.remove_listeners(|registration| registration.owner_addr == addr);
        if removed > 0 {
            info!(
                "Removed {removed} change listener(s) of {}",
                std::any::type_name::<T>()
            );
        }
        removed
    }

    /// Remove every change listener this processor subscribed
    pub fn unsubscribe_all(&self) -> usize {
        let registrations = std::mem::take(&mut *self.listeners.write_recovered());
        registrations.iter().filter(|r| r.remove()).count()
    }

    /// Remove the change listeners of owners that have been dropped
    pub fn prune_listeners(&self) -> usize {
        let (_, pruned) = self.remove_listeners(|_| false);
        pruned
    }

    /// Removes registrations matching `select` plus those of dropped owners,
    /// returning both counts
    fn remove_listeners(&self, select: impl Fn(&ListenerRegistration) -> bool) -> (usize, usize) {
        let (selected, dead) = {
            let mut listeners = self.listeners.write_recovered();
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *listeners)
                .into_iter()
                .partition(|r| select(r) || r.owner.strong_count() == 0);
            *listeners = kept;
            gone.into_iter().partition::<Vec<_>, _>(|r| select(r))
        };

        for registration in selected.iter().chain(&dead) {
            if !registration.remove() {
                debug!(
                    "Change listener {} already gone from namespace '{}'",
                    registration.id.get(),
                    registration.config.namespace()
                );
            }
        }
        if !dead.is_empty() {
            debug!("Pruned {} change listener(s) of dropped owners", dead.len());
        }
        (selected.len(), dead.len())
    }

    /// Discover and register the members of a [`Bindable`] object
    ///
    /// Must run once per object: a second call registers duplicates. The
    /// caller must not hold the owner's lock.
    ///
    /// # Errors
    ///
    /// - [`Error::ListenerSignature`] for a listener that is not a method
    ///   taking exactly one `ChangeEvent`
    /// - [`Error::InvalidConfigField`] for a config annotation on a member
    ///   that is not a `Config` field
    /// - [`Error::Injection`] if writing an injected config failed
    pub fn process<T: Bindable>(&self, owner: &Arc<RwLock<T>>) -> Result<DiscoveryReport> {
        self.process_members(owner, T::members())
    }

    /// Discover and register an explicit list of members
    ///
    /// # Errors
    ///
    /// Same as [`process`](Self::process).
    pub fn process_members<T: Send + Sync + 'static>(
        &self,
        owner: &Arc<RwLock<T>>,
        members: Vec<Member<T>>,
    ) -> Result<DiscoveryReport> {
        let owner_type = std::any::type_name::<T>();
        let (fields, methods): (Vec<_>, Vec<_>) = members.iter().partition(|m| !m.is_method());

        let mut bindings = Vec::new();
        let mut injections = Vec::new();
        let mut subscriptions = Vec::new();

        for member in fields.into_iter().chain(methods) {
            let display = format!("{owner_type}.{}", member.display_name());
            for annotation in member.annotations() {
                match annotation {
                    Annotation::Value(expression) => {
                        if let Some(binding) = self.plan_binding(owner, member, expression, &display) {
                            bindings.push(binding);
                        }
                    }
                    Annotation::Config(namespace) => {
                        check_config_field(member, &display)?;
                        injections.push(Injection {
                            namespace: namespace.clone(),
                            member: display.clone(),
                            accessor: member.accessor(),
                        });
                    }
                    Annotation::ChangeListener(namespaces) => {
                        check_listener(member, &display)?;
                        subscriptions.push(Subscription {
                            namespaces: namespaces.clone(),
                            member: display.clone(),
                            accessor: member.accessor(),
                        });
                    }
                }
            }
        }

        let configs_injected = self.inject_configs(owner, injections)?;
        let bindings = self.registry.register_all(bindings);
        let listeners = self.subscribe(owner, subscriptions);
        let initialized = self.initialize(&bindings);

        debug!(
            "Processed {owner_type}: {} binding(s), {configs_injected} config(s), {listeners} listener(s)",
            bindings.len()
        );

        Ok(DiscoveryReport {
            owner_type,
            bindings,
            configs_injected,
            listeners,
            initialized,
        })
    }

    fn plan_binding<T: Send + Sync + 'static>(
        &self,
        owner: &Arc<RwLock<T>>,
        member: &Member<T>,
        expression: &str,
        display: &str,
    ) -> Option<Binding> {
        let Some(parsed) = self.matcher.parse(expression) else {
            debug!("Expression '{expression}' on {display} is not a placeholder, not binding");
            return None;
        };

        let binding = Binding::new(parsed.key, parsed.default_value, owner, member);
        if self.reject_invalid_setters && matches!(binding.target(), BindTarget::Invalid { .. }) {
            error!(
                "Not registering {display} for key={}: target can never be updated",
                binding.key()
            );
            return None;
        }
        Some(binding)
    }

    fn inject_configs<T: Send + Sync + 'static>(
        &self,
        owner: &Arc<RwLock<T>>,
        injections: Vec<Injection<T>>,
    ) -> Result<usize> {
        if injections.is_empty() {
            return Ok(0);
        }

        let mut guard = owner.write_recovered();
        for (done, injection) in injections.iter().enumerate() {
            let config = self.service.config(&injection.namespace);
            if let Err(reason) = (injection.accessor)(&mut *guard, Argument::Config(config)) {
                for injected in injections[..done].iter().rev() {
                    if let Err(unset) = (injected.accessor)(&mut *guard, Argument::Unset) {
                        warn!("Could not withdraw config from {}: {unset}", injected.member);
                    }
                }
                return Err(Error::Injection {
                    member: injection.member.clone(),
                    reason,
                });
            }
        }
        drop(guard);

        for injection in &injections {
            info!(
                "Injected config namespace '{}' into {}",
                injection.namespace, injection.member
            );
        }
        Ok(injections.len())
    }

    fn subscribe<T: Send + Sync + 'static>(
        &self,
        owner: &Arc<RwLock<T>>,
        subscriptions: Vec<Subscription<T>>,
    ) -> usize {
        if subscriptions.is_empty() {
            return 0;
        }
        self.prune_listeners();

        let mut registrations = Vec::new();
        for subscription in subscriptions {
            for namespace in &subscription.namespaces {
                let weak = Arc::downgrade(owner);
                let accessor = Arc::clone(&subscription.accessor);
                let member = subscription.member.clone();

                let config = self.service.config(namespace);
                let id = config.add_change_listener(Arc::new(move |event: &ChangeEvent| {
                    let Some(owner) = weak.upgrade() else {
                        debug!("Owner of {member} dropped, ignoring change event");
                        return;
                    };
                    let mut guard = owner.write_recovered();
                    if let Err(reason) = accessor(&mut *guard, Argument::Event(event)) {
                        error!(
                            "Change listener {member} failed for namespace '{}': {reason}",
                            event.namespace()
                        );
                    }
                }));

                info!("Registered change listener {} on namespace '{namespace}'", subscription.member);
                let owner_ref: Weak<dyn Any + Send + Sync> = Arc::downgrade(owner) as Weak<dyn Any + Send + Sync>;
                registrations.push(ListenerRegistration {
                    owner: owner_ref,
                    owner_addr: owner_addr(owner),
                    config,
                    id,
                });
            }
        }

        let count = registrations.len();
        self.listeners.write_recovered().extend(registrations);
        count
    }

    fn initialize(&self, bindings: &[Arc<Binding>]) -> usize {
        let Some(namespaces) = &self.initial_namespaces else {
            return 0;
        };

        let mut initialized = 0;
        for binding in bindings {
            let current = namespaces
                .iter()
                .find_map(|ns| self.service.config(ns).property(binding.key()));
            let raw = match current.as_deref().or(binding.default_value()) {
                Some(raw) => raw,
                None => {
                    debug!("No initial value for key={}, leaving {} as is", binding.key(), binding.display_name());
                    continue;
                }
            };
            if binding.apply(raw).is_ok() {
                initialized += 1;
            }
        }
        initialized
    }
}

impl std::fmt::Debug for BindingProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingProcessor")
            .field("registry", &self.registry)
            .field("matcher", &self.matcher)
            .field("reject_invalid_setters", &self.reject_invalid_setters)
            .field("initial_namespaces", &self.initial_namespaces)
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

fn check_config_field<T>(member: &Member<T>, display: &str) -> Result<()> {
    match member.kind() {
        MemberKind::Field(ValueType::Config) => Ok(()),
        MemberKind::Field(other) => Err(Error::InvalidConfigField {
            member: display.to_string(),
            found: other.to_string(),
        }),
        MemberKind::Method(_) => Err(Error::InvalidConfigField {
            member: display.to_string(),
            found: "method".to_string(),
        }),
    }
}

fn check_listener<T>(member: &Member<T>, display: &str) -> Result<()> {
    let params = match member.kind() {
        MemberKind::Method(params) => params,
        MemberKind::Field(_) => {
            return Err(Error::ListenerSignature {
                member: display.to_string(),
                reason: "only methods can listen for changes".to_string(),
            });
        }
    };
    match params.as_slice() {
        [ValueType::ChangeEvent] => Ok(()),
        [other] => Err(Error::ListenerSignature {
            member: display.to_string(),
            reason: format!("Invalid parameter type: {other}, should be ChangeEvent"),
        }),
        _ => Err(Error::ListenerSignature {
            member: display.to_string(),
            reason: format!("Invalid number of parameters: {}, should be 1", params.len()),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================
