//! Error types for confbind

use crate::convert::TypeTag;
use thiserror::Error;

/// Result type alias for confbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for confbind
///
/// Only discovery-time structural problems and configuration/loading problems
/// surface through this type. Per-binding update failures are reported with
/// [`ApplyError`] and never abort a dispatch.
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // Discovery Errors
    // -------------------------------------------------------------------------
    #[error("Invalid change listener '{member}': {reason}")]
    ListenerSignature { member: String, reason: String },

    #[error("Invalid type {found} for config field '{member}', should be Config")]
    InvalidConfigField { member: String, found: String },

    #[error("Failed to inject config into '{member}': {reason}")]
    Injection { member: String, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Invalid value expression pattern '{pattern}': {reason}")]
    InvalidExpressionPattern { pattern: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Properties Source Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to parse properties: {0}")]
    Parse(String),
}

impl Error {
    /// Check if this error was raised while discovering bindings on an object
    #[must_use]
    pub fn is_discovery_error(&self) -> bool {
        matches!(
            self,
            Error::ListenerSignature { .. }
                | Error::InvalidConfigField { .. }
                | Error::Injection { .. }
        )
    }
}

/// A raw string that could not be converted to a binding's target type
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot convert '{input}' to {target}: {reason}")]
pub struct ConversionError {
    /// The raw value that was rejected
    pub input: String,
    /// The type the value was converted to
    pub target: TypeTag,
    /// Why the conversion failed
    pub reason: String,
}

impl ConversionError {
    pub(crate) fn new(input: &str, target: TypeTag, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            target,
            reason: reason.into(),
        }
    }
}

/// Failure to apply a value to a single binding
///
/// Isolated to the binding it came from; the dispatcher records it and
/// moves on to the next binding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error(transparent)]
    ConversionFailed(#[from] ConversionError),

    #[error("write failed: {reason}")]
    WriteFailed { reason: String },

    #[error("invalid target: {reason}")]
    InvalidTarget { reason: String },
}

impl ApplyError {
    /// Check if the raw value was rejected by the converter
    #[must_use]
    pub fn is_conversion(&self) -> bool {
        matches!(self, ApplyError::ConversionFailed(_))
    }

    /// Check if the binding can never be applied
    #[must_use]
    pub fn is_invalid_target(&self) -> bool {
        matches!(self, ApplyError::InvalidTarget { .. })
    }
}
