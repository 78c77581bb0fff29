//! Automatic dispatch of namespace change events

use crate::dispatcher::{DispatchReport, UpdateDispatcher};
use crate::source::{ChangeEvent, Config, ConfigService, ListenerId};
use crate::sync::RwLockExt;
use log::{debug, info};
use std::sync::{Arc, RwLock};

/// Forwards change events from watched namespaces to the dispatcher
///
/// The value applied for a changed key is the effective one across all
/// watched namespaces (first namespace that has the key wins), not just the
/// value in the namespace that fired. A key missing from every namespace
/// falls back to the binding defaults.
///
/// Subscriptions only hold a weak reference back to the listener, so they
/// stop forwarding once it is dropped even without [`uninstall`](Self::uninstall).
pub(crate) struct AutoUpdateListener {
    dispatcher: Arc<UpdateDispatcher>,
    service: Arc<dyn ConfigService>,
    namespaces: Vec<String>,
    installed: RwLock<Vec<(Config, ListenerId)>>,
}

impl AutoUpdateListener {
    pub(crate) fn new(
        dispatcher: Arc<UpdateDispatcher>,
        service: Arc<dyn ConfigService>,
        namespaces: Vec<String>,
    ) -> Self {
        Self {
            dispatcher,
            service,
            namespaces,
            installed: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to every watched namespace
    pub(crate) fn install(self: &Arc<Self>) {
        let mut installed = self.installed.write_recovered();
        for namespace in &self.namespaces {
            let listener = Arc::downgrade(self);
            let config = self.service.config(namespace);
            let id = config.add_change_listener(Arc::new(move |event: &ChangeEvent| {
                if let Some(listener) = listener.upgrade() {
                    listener.on_change(event);
                }
            }));
            installed.push((config, id));
            info!("Auto-update enabled for namespace '{namespace}'");
        }
    }

    /// Remove the subscriptions added by [`install`](Self::install)
    pub(crate) fn uninstall(&self) -> usize {
        let installed = std::mem::take(&mut *self.installed.write_recovered());
        let removed = installed
            .iter()
            .filter(|(config, id)| config.remove_change_listener(*id))
            .count();
        if removed > 0 {
            info!("Auto-update disabled for {removed} namespace(s)");
        }
        removed
    }

    pub(crate) fn on_change(&self, event: &ChangeEvent) -> Vec<DispatchReport> {
        let registry = self.dispatcher.registry();
        event
            .changed_keys()
            .filter(|key| registry.contains_key(key))
            .map(|key| match self.resolve(key) {
                Some(raw) => self.dispatcher.on_key_changed(key, &raw),
                None => self.dispatcher.on_key_removed(key),
            })
            .collect()
    }

    /// Current value of `key` in all watched namespaces, in order
    pub(crate) fn resolve(&self, key: &str) -> Option<String> {
        let found = self
            .namespaces
            .iter()
            .find_map(|ns| self.service.config(ns).property(key));
        if found.is_none() {
            debug!("Key={key} no longer set in any watched namespace");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{BindValue, Binding, Member};
    use crate::registry::BindingRegistry;
    use crate::source::MemoryConfigService;
    use std::sync::RwLock;

    #[derive(Default)]
    struct Pool {
        size: i32,
    }

    fn setup(
        namespaces: &[&str],
    ) -> (Arc<MemoryConfigService>, Arc<RwLock<Pool>>, Arc<AutoUpdateListener>) {
        let service = Arc::new(MemoryConfigService::new());
        let registry = Arc::new(BindingRegistry::new());
        let dispatcher = Arc::new(UpdateDispatcher::new(Arc::clone(&registry)));
        let updater = Arc::new(AutoUpdateListener::new(
            dispatcher,
            service.clone(),
            namespaces.iter().map(|s| s.to_string()).collect(),
        ));
        updater.install();

        let pool = Arc::new(RwLock::new(Pool::default()));
        let member = Member::field("size", i32::value_type(), |p: &mut Pool, arg| {
            p.size = i32::from_argument(arg)?;
            Ok(())
        });
        registry.register(Binding::new("pool.size", Some("4".into()), &pool, &member));
        (service, pool, updater)
    }

    #[test]
    fn test_change_reaches_binding() {
        let (service, pool, _updater) = setup(&["application"]);

        service.namespace("application").set_property("pool.size", "16");
        assert_eq!(pool.read().unwrap().size, 16);

        service.namespace("application").remove_property("pool.size");
        assert_eq!(pool.read().unwrap().size, 4);
    }

    #[test]
    fn test_first_namespace_wins() {
        let (service, pool, _updater) = setup(&["application", "shared"]);

        service.namespace("application").set_property("pool.size", "8");
        service.namespace("shared").set_property("pool.size", "32");
        assert_eq!(pool.read().unwrap().size, 8);

        // Removing the winning value exposes the next namespace
        service.namespace("application").remove_property("pool.size");
        assert_eq!(pool.read().unwrap().size, 32);
    }

    #[test]
    fn test_unwatched_namespace_ignored() {
        let (service, pool, _updater) = setup(&["application"]);

        service.namespace("other").set_property("pool.size", "99");
        assert_eq!(pool.read().unwrap().size, 0);
    }

    #[test]
    fn test_uninstall_stops_updates() {
        let (service, pool, updater) = setup(&["application", "shared"]);
        assert_eq!(service.namespace("shared").listener_count(), 1);

        assert_eq!(updater.uninstall(), 2);
        assert_eq!(updater.uninstall(), 0);
        service.namespace("application").set_property("pool.size", "16");
        assert_eq!(pool.read().unwrap().size, 0);
        assert_eq!(service.namespace("application").listener_count(), 0);
    }

    #[test]
    fn test_dropped_listener_stops_forwarding() {
        let (service, pool, updater) = setup(&["application"]);
        drop(updater);

        service.namespace("application").set_property("pool.size", "16");
        assert_eq!(pool.read().unwrap().size, 0);
    }
}
