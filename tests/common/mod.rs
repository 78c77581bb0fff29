//! Common test utilities for confbind integration tests
//!
//! Provides shared bindable fixtures and helper functions.

#![allow(dead_code)]

use confbind::{
    Annotation, Argument, BindValue, Bindable, ChangeEvent, Config, Member, MemoryConfigService,
    ValueBinder, ValueType,
};
use std::sync::{Arc, RwLock};
use time::Date;

// =============================================================================
// Logging
// =============================================================================

/// Route `log` output through the test harness
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// =============================================================================
// Test Bindables
// =============================================================================

/// A data source covering every kind of member
#[derive(Debug, Default)]
pub struct DataSource {
    pub url: String,
    pub pool_size: i32,
    pub timeout: i64,
    pub ratio: f64,
    pub enabled: bool,
    pub launch: Option<Date>,
    pub config: Option<Config>,
    pub events: Vec<String>,
}

impl DataSource {
    pub fn set_timeout(&mut self, seconds: i64) -> Result<(), String> {
        if seconds < 0 {
            return Err(format!("timeout must not be negative, got {seconds}"));
        }
        self.timeout = seconds;
        Ok(())
    }

    pub fn on_change(&mut self, event: &ChangeEvent) {
        self.events.extend(event.changed_keys().map(str::to_string));
    }
}

impl Bindable for DataSource {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::field("url", String::value_type(), |d: &mut DataSource, arg| {
                d.url = String::from_argument(arg)?;
                Ok(())
            })
            .value("${db.url}:jdbc:h2:mem"),
            Member::field("pool_size", i32::value_type(), |d: &mut DataSource, arg| {
                d.pool_size = i32::from_argument(arg)?;
                Ok(())
            })
            .value("${db.pool.size}:4"),
            Member::field("ratio", f64::value_type(), |d: &mut DataSource, arg| {
                d.ratio = f64::from_argument(arg)?;
                Ok(())
            })
            .value("${db.ratio}"),
            Member::field("enabled", bool::value_type(), |d: &mut DataSource, arg| {
                d.enabled = bool::from_argument(arg)?;
                Ok(())
            })
            .value("${db.enabled}:true"),
            Member::field("launch", Option::<Date>::value_type(), |d: &mut DataSource, arg| {
                d.launch = Option::<Date>::from_argument(arg)?;
                Ok(())
            })
            .value("${db.launch}"),
            Member::field("config", Option::<Config>::value_type(), |d: &mut DataSource, arg| {
                d.config = Option::<Config>::from_argument(arg)?;
                Ok(())
            })
            .annotated(Annotation::Config("datasource".into())),
            Member::method("set_timeout", vec![i64::value_type()], |d: &mut DataSource, arg| {
                d.set_timeout(i64::from_argument(arg)?)
            })
            .value("${db.timeout}:30"),
            Member::method(
                "on_change",
                vec![ValueType::ChangeEvent],
                |d: &mut DataSource, arg| match arg {
                    Argument::Event(event) => {
                        d.on_change(event);
                        Ok(())
                    }
                    _ => Err("on_change expects a change event".to_string()),
                },
            )
            .annotated(Annotation::ChangeListener(vec!["application".into()])),
        ]
    }
}

/// Single integer target, bound to a caller-chosen key
#[derive(Debug, Default)]
pub struct Counter {
    pub value: i32,
}

/// Members binding `Counter::value` to `key`
pub fn counter_members(key: &str) -> Vec<Member<Counter>> {
    vec![
        Member::field("value", i32::value_type(), |c: &mut Counter, arg| {
            c.value = i32::from_argument(arg)?;
            Ok(())
        })
        .value(format!("${{{key}}}")),
    ]
}

// =============================================================================
// Test Fixtures
// =============================================================================

/// A memory-backed service with a binder watching `application`
pub struct TestFixture {
    pub service: Arc<MemoryConfigService>,
    pub binder: ValueBinder,
}

impl TestFixture {
    /// Create a fixture with default binder options
    pub fn new() -> Self {
        init_logger();
        let service = Arc::new(MemoryConfigService::new());
        let binder = ValueBinder::builder(service.clone())
            .build()
            .expect("Failed to create binder");
        Self { service, binder }
    }

    /// Create a fixture that applies current values on bind
    pub fn with_initial_values() -> Self {
        init_logger();
        let service = Arc::new(MemoryConfigService::new());
        let binder = ValueBinder::builder(service.clone())
            .inject_initial_values(true)
            .build()
            .expect("Failed to create binder");
        Self { service, binder }
    }

    /// Set a property in the `application` namespace
    pub fn set(&self, key: &str, value: &str) {
        self.service.namespace("application").set_property(key, value);
    }

    /// Remove a property from the `application` namespace
    pub fn remove(&self, key: &str) {
        self.service.namespace("application").remove_property(key);
    }
}

/// Wrap a value the way bound objects are shared
pub fn shared<T>(value: T) -> Arc<RwLock<T>> {
    Arc::new(RwLock::new(value))
}
