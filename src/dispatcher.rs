//! Applying configuration changes to registered bindings

use crate::binding::Binding;
use crate::error::ApplyError;
use crate::registry::BindingRegistry;
use crate::source::{ChangeEvent, ChangeType};
use log::debug;
use std::sync::Arc;

/// One binding that did not accept an update
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyFailure {
    /// `<owner type>.<member>` of the binding
    pub binding: String,
    pub error: ApplyError,
}

/// Outcome of dispatching one key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    pub key: String,
    /// Bindings updated successfully
    pub applied: usize,
    /// Bindings left untouched (removed key, no default)
    pub skipped: usize,
    pub failures: Vec<ApplyFailure>,
}

impl DispatchReport {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, binding: &Binding, result: Result<(), ApplyError>) {
        match result {
            Ok(()) => self.applied += 1,
            Err(error) => self.failures.push(ApplyFailure {
                binding: binding.display_name().to_string(),
                error,
            }),
        }
    }

    /// Number of bindings the key was dispatched to
    #[must_use]
    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.failures.len()
    }

    /// Whether every binding accepted the update
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pushes changed values into every binding of a key
///
/// Each binding is applied independently and in registration order; a
/// failing binding is recorded and the rest still run. Nothing is rolled
/// back.
#[derive(Debug)]
pub struct UpdateDispatcher {
    registry: Arc<BindingRegistry>,
    prune_released_owners: bool,
}

impl UpdateDispatcher {
    /// Create a dispatcher over `registry`
    #[must_use]
    pub fn new(registry: Arc<BindingRegistry>) -> Self {
        Self {
            registry,
            prune_released_owners: true,
        }
    }

    /// Remove bindings of dropped owners after a dispatch that hit one
    /// (default: enabled)
    #[must_use]
    pub fn prune_released_owners(mut self, enabled: bool) -> Self {
        self.prune_released_owners = enabled;
        self
    }

    /// The registry this dispatcher reads from
    #[must_use]
    pub fn registry(&self) -> &Arc<BindingRegistry> {
        &self.registry
    }

    /// Apply a new raw value to every binding of `key`
    ///
    /// An unknown key is a no-op.
    pub fn on_key_changed(&self, key: &str, new_raw: &str) -> DispatchReport {
        self.dispatch(key, |binding| Some(binding.apply(new_raw)))
    }

    /// Handle removal of `key` from the configuration
    ///
    /// Bindings whose expression carried a default go back to it; the others
    /// keep their current value and are counted as skipped.
    pub fn on_key_removed(&self, key: &str) -> DispatchReport {
        self.dispatch(key, Binding::apply_default)
    }

    /// Dispatch every key of a change event
    ///
    /// Added and modified keys are applied with their new value, deleted
    /// keys fall back to their defaults.
    pub fn on_change_event(&self, event: &ChangeEvent) -> Vec<DispatchReport> {
        event
            .changes()
            .filter(|change| self.registry.contains_key(&change.property_name))
            .map(|change| match (change.change_type, change.new_value.as_deref()) {
                (ChangeType::Deleted, _) | (_, None) => self.on_key_removed(&change.property_name),
                (_, Some(new_raw)) => self.on_key_changed(&change.property_name, new_raw),
            })
            .collect()
    }

    fn dispatch(
        &self,
        key: &str,
        apply: impl Fn(&Binding) -> Option<Result<(), ApplyError>>,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(key);
        let bindings = self.registry.bindings_for(key);
        if bindings.is_empty() {
            debug!("No bindings for key={key}, nothing to update");
            return report;
        }

        let mut released = false;
        for binding in &bindings {
            match apply(&**binding) {
                Some(result) => {
                    released |= result.is_err() && !binding.is_alive();
                    report.record(binding, result);
                }
                None => {
                    debug!("Key={key} removed, keeping current value of {}", binding.display_name());
                    report.skipped += 1;
                }
            }
        }

        if released && self.prune_released_owners {
            self.registry.prune();
        }
        report
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindValue, Member};
    use crate::source::ConfigChange;
    use std::sync::{Mutex, RwLock};

    #[derive(Default)]
    struct Target {
        value: i32,
        name: String,
    }

    fn value_member(log: Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Member<Target> {
        Member::field("value", i32::value_type(), move |t: &mut Target, arg| {
            t.value = i32::from_argument(arg)?;
            log.lock().unwrap().push(tag);
            Ok(())
        })
    }

    fn name_member() -> Member<Target> {
        Member::field("name", String::value_type(), |t: &mut Target, arg| {
            t.name = String::from_argument(arg)?;
            Ok(())
        })
    }

    fn target() -> Arc<RwLock<Target>> {
        Arc::new(RwLock::new(Target::default()))
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let order = Arc::new(Mutex::new(Vec::new()));
        let first = target();
        let second = target();

        registry.register(Binding::new("v", None, &first, &value_member(Arc::clone(&order), "first")));
        registry.register(Binding::new("v", None, &second, &value_member(Arc::clone(&order), "second")));

        let report = dispatcher.on_key_changed("v", "7");
        assert_eq!(report.applied, 2);
        assert!(report.is_success());
        assert_eq!(first.read().unwrap().value, 7);
        assert_eq!(second.read().unwrap().value, 7);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_other_keys_untouched() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let a = target();
        let b = target();
        registry.register(Binding::new("a", None, &a, &name_member()));
        registry.register(Binding::new("b", None, &b, &name_member()));

        dispatcher.on_key_changed("a", "alpha");
        assert_eq!(a.read().unwrap().name, "alpha");
        assert_eq!(b.read().unwrap().name, "");

        let report = dispatcher.on_key_changed("missing", "x");
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_failure_does_not_stop_others() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let order = Arc::new(Mutex::new(Vec::new()));
        let numeric = target();
        let text = target();

        registry.register(Binding::new("k", None, &numeric, &value_member(Arc::clone(&order), "n")));
        registry.register(Binding::new("k", None, &text, &name_member()));

        let report = dispatcher.on_key_changed("k", "not-a-number");
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].error.is_conversion());
        assert!(report.failures[0].binding.ends_with("Target.value"));
        assert_eq!(text.read().unwrap().name, "not-a-number");
        assert_eq!(numeric.read().unwrap().value, 0);
    }

    #[test]
    fn test_removed_key_restores_defaults() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let with_default = target();
        let without_default = target();

        registry.register(Binding::new("name", Some("fallback".into()), &with_default, &name_member()));
        registry.register(Binding::new("name", None, &without_default, &name_member()));
        dispatcher.on_key_changed("name", "live");

        let report = dispatcher.on_key_removed("name");
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(with_default.read().unwrap().name, "fallback");
        assert_eq!(without_default.read().unwrap().name, "live");
    }

    #[test]
    fn test_change_event_routing() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let t = target();
        registry.register(Binding::new("name", Some("none".into()), &t, &name_member()));

        let event = ChangeEvent::new(
            "application",
            [
                ConfigChange::between("name", None, Some("added".into())).unwrap(),
                ConfigChange::between("unbound", None, Some("x".into())).unwrap(),
            ],
        );
        let reports = dispatcher.on_change_event(&event);
        assert_eq!(reports.len(), 1);
        assert_eq!(t.read().unwrap().name, "added");

        let event = ChangeEvent::new(
            "application",
            [ConfigChange::between("name", Some("added".into()), None).unwrap()],
        );
        dispatcher.on_change_event(&event);
        assert_eq!(t.read().unwrap().name, "none");
    }

    #[test]
    fn test_dropped_owner_is_pruned() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry));
        let kept = target();
        {
            let gone = target();
            registry.register(Binding::new("name", None, &gone, &name_member()));
        }
        registry.register(Binding::new("name", None, &kept, &name_member()));

        let report = dispatcher.on_key_changed("name", "x");
        assert_eq!(report.applied, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_pruning_can_be_disabled() {
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = UpdateDispatcher::new(Arc::clone(&registry)).prune_released_owners(false);
        {
            let gone = target();
            registry.register(Binding::new("name", None, &gone, &name_member()));
        }

        dispatcher.on_key_changed("name", "x");
        assert_eq!(registry.len(), 1);
    }
}
