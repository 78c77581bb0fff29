//! Binder configuration
//!
//! - `BinderConfig` - Options for a [`ValueBinder`](crate::ValueBinder)
//! - `BinderConfigBuilder` - Fluent construction of a `BinderConfig`

mod types;

pub use types::{BinderConfig, BinderConfigBuilder, DEFAULT_NAMESPACE};
