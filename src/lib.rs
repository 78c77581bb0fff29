//! # confbind - Live Configuration Binding
//!
//! A registry that binds configuration keys to fields and setter methods of
//! live objects, converts incoming string values to the target types, and
//! pushes updates into every bound object when the configuration changes.
//!
//! ## Features
//!
//! - **Placeholder Bindings**: `${server.port}:8080` binds a member to a key with a default
//! - **Typed Conversion**: integers, floats, booleans, ISO dates and strings
//! - **Fan-out Updates**: one key can drive any number of objects, in registration order
//! - **Failure Isolation**: a binding that rejects a value never stops the others
//! - **Change Listeners**: methods invoked with every change event of a namespace
//! - **Config Injection**: fields receiving a whole namespace handle
//! - **File Sources**: JSON, TOML and YAML documents flattened into dotted keys
//! - **Derive Macro**: `#[derive(Bindable)]` instead of hand-written member lists
//!
//! ## Quick Start
//!
//! ```rust
//! use confbind::{BindValue, Bindable, Member, MemoryConfigService, ValueBinder};
//! use std::sync::{Arc, RwLock};
//!
//! #[derive(Default)]
//! struct HttpServer {
//!     port: i32,
//!     keep_alive: bool,
//! }
//!
//! impl Bindable for HttpServer {
//!     fn members() -> Vec<Member<Self>> {
//!         vec![
//!             Member::field("port", i32::value_type(), |s: &mut HttpServer, arg| {
//!                 s.port = i32::from_argument(arg)?;
//!                 Ok(())
//!             })
//!             .value("${http.port}:8080"),
//!             Member::field("keep_alive", bool::value_type(), |s: &mut HttpServer, arg| {
//!                 s.keep_alive = bool::from_argument(arg)?;
//!                 Ok(())
//!             })
//!             .value("${http.keep-alive}:on"),
//!         ]
//!     }
//! }
//!
//! let service = Arc::new(MemoryConfigService::new());
//! let binder = ValueBinder::builder(service.clone())
//!     .inject_initial_values(true)
//!     .build()?;
//!
//! let server = Arc::new(RwLock::new(HttpServer::default()));
//! binder.bind(&server)?;
//! assert_eq!(server.read().unwrap().port, 8080);
//!
//! service.namespace("application").set_property("http.port", "9000");
//! assert_eq!(server.read().unwrap().port, 9000);
//! # Ok::<(), confbind::Error>(())
//! ```
//!
//! ## Ownership
//!
//! Objects are shared as `Arc<RwLock<T>>`. Bindings hold weak references,
//! so binding an object never keeps it alive. Once dropped, its bindings
//! fail with a write error and are pruned on the next dispatch. Use
//! [`ValueBinder::unbind`] to stop updates of an object that is still alive.
//! Dropping the [`ValueBinder`] removes every change listener it added.
//!
//! ## Removed Keys
//!
//! When a key disappears from the configuration, bindings whose expression
//! carries a default go back to it. Bindings without a default keep their
//! last value.
//!
//! ## Derive Macro
//!
//! ```rust,ignore
//! use confbind::{Config, DeriveBindable};
//!
//! #[derive(Default, DeriveBindable)]
//! #[bindable(setter(method = "set_pool_size", value = "${db.pool}:4", arg = "i32"))]
//! #[bindable(listener(method = "on_change", namespaces = ["application"]))]
//! struct DataSource {
//!     #[value("${db.url}")]
//!     url: String,
//!     #[config("datasource")]
//!     config: Option<Config>,
//!     pool_size: i32,
//! }
//! ```

// Core modules
mod binder;
mod binding;
mod dispatcher;
mod error;
mod sync;

// Grouped modules
pub mod config;
pub mod convert;
pub mod discovery;
pub mod expression;
pub mod registry;
pub mod source;

// Re-exports from core
pub use binder::{ValueBinder, ValueBinderBuilder};
pub use binding::{
    Accessor, Annotation, Argument, BindTarget, BindValue, Bindable, Binding, Member, MemberKind,
    SetterOutcome, ValueType,
};
pub use dispatcher::{ApplyFailure, DispatchReport, UpdateDispatcher};
pub use error::{ApplyError, ConversionError, Error, Result};

// Re-exports from grouped modules
pub use config::{BinderConfig, BinderConfigBuilder, DEFAULT_NAMESPACE};
pub use convert::{Converter, TypeTag, Value};
pub use discovery::{BindingProcessor, DiscoveryReport};
pub use expression::{ExpressionMatcher, ValueExpression};
pub use registry::BindingRegistry;
pub use source::{
    ChangeEvent, ChangeListener, ChangeType, Config, ConfigChange, ConfigHandle, ConfigService,
    JsonFormat, ListenerId, MemoryConfig, MemoryConfigService, PropertiesFormat,
};

#[cfg(feature = "toml")]
pub use source::TomlFormat;
#[cfg(feature = "yaml")]
pub use source::YamlFormat;

// Derive macro re-export (requires `derive` feature)
/// Derive macro for generating `Bindable` implementations.
///
/// Field attributes: `#[value("${key}:default")]` binds a field,
/// `#[config("namespace")]` injects a namespace into an `Option<Config>`
/// field. Container attributes bind setter methods
/// (`#[bindable(setter(method = "..", value = "..", arg = "i64"))]`) and
/// register change listeners
/// (`#[bindable(listener(method = "..", namespaces = ["application"]))]`).
#[cfg(feature = "derive")]
pub use confbind_derive::Bindable as DeriveBindable;
