//! Bindings: one configuration key attached to one member of a live object
//!
//! A [`Binding`] holds a weak reference to its owner, so registering an
//! object never extends its lifetime. Once the owner is dropped every apply
//! fails with [`ApplyError::WriteFailed`] and the binding can be pruned from
//! the registry.

mod member;

pub use member::{
    Accessor, Annotation, Argument, BindValue, Bindable, Member, MemberKind, SetterOutcome,
    ValueType,
};

use crate::convert::{Converter, TypeTag};
use crate::error::ApplyError;
use crate::sync::RwLockExt;
use log::{error, info, warn};
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// What a binding writes to
#[derive(Debug, Clone)]
pub enum BindTarget {
    /// Direct field write
    Field(Converter),
    /// Single-argument method call
    Method(Converter),
    /// Structurally unusable member; every apply fails
    Invalid { reason: String },
}

/// Type-erased owner reference plus accessor
trait OwnerSlot: Send + Sync {
    fn write(&self, arg: Argument<'_>) -> Result<(), String>;
    fn is_alive(&self) -> bool;
    fn owner_addr(&self) -> usize;
}

struct WeakSlot<T> {
    owner: Weak<RwLock<T>>,
    accessor: Accessor<T>,
}

impl<T: Send + Sync + 'static> OwnerSlot for WeakSlot<T> {
    fn write(&self, arg: Argument<'_>) -> Result<(), String> {
        let owner = self
            .owner
            .upgrade()
            .ok_or_else(|| "owner has been dropped".to_string())?;
        let mut guard = owner.write_recovered();
        (self.accessor)(&mut *guard, arg)
    }

    fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    fn owner_addr(&self) -> usize {
        // The weak reference keeps the allocation, so the address stays unique
        self.owner.as_ptr() as *const () as usize
    }
}

pub(crate) fn owner_addr<T>(owner: &Arc<RwLock<T>>) -> usize {
    Arc::as_ptr(owner) as *const () as usize
}

/// A configuration key bound to one member of one owner
pub struct Binding {
    key: String,
    default_value: Option<String>,
    owner_type: &'static str,
    display_name: String,
    target: BindTarget,
    slot: Box<dyn OwnerSlot>,
}

impl Binding {
    /// Create a binding for `member` of `owner`
    ///
    /// Never fails. A method that does not take exactly one convertible
    /// parameter, or a field that cannot hold a scalar, produces a binding
    /// whose target is [`BindTarget::Invalid`].
    pub fn new<T: Send + Sync + 'static>(
        key: impl Into<String>,
        default_value: Option<String>,
        owner: &Arc<RwLock<T>>,
        member: &Member<T>,
    ) -> Self {
        let owner_type = std::any::type_name::<T>();
        let display_name = format!("{owner_type}.{}", member.display_name());
        let target = resolve_target(member.kind());

        if let BindTarget::Invalid { reason } = &target {
            warn!("Invalid setter, can not update {display_name}: {reason}");
        }

        Self {
            key: key.into(),
            default_value,
            owner_type,
            display_name,
            target,
            slot: Box::new(WeakSlot {
                owner: Arc::downgrade(owner),
                accessor: member.accessor(),
            }),
        }
    }

    /// Apply a raw value to the target
    ///
    /// The outcome is logged; failures are returned, never raised.
    ///
    /// # Errors
    ///
    /// - [`ApplyError::InvalidTarget`] for a degenerate target (owner untouched)
    /// - [`ApplyError::ConversionFailed`] if `raw` does not convert
    /// - [`ApplyError::WriteFailed`] if the owner is gone or the accessor refused
    pub fn apply(&self, raw: &str) -> Result<(), ApplyError> {
        let result = self.try_apply(raw);
        match &result {
            Ok(()) => info!(
                "Auto-updated {} (key={}) with new value '{}'",
                self.display_name, self.key, raw
            ),
            Err(e) => error!(
                "Failed to update {} (key={}) with new value '{}': {}",
                self.display_name, self.key, raw, e
            ),
        }
        result
    }

    fn try_apply(&self, raw: &str) -> Result<(), ApplyError> {
        let converter = match &self.target {
            BindTarget::Field(converter) | BindTarget::Method(converter) => converter,
            BindTarget::Invalid { reason } => {
                return Err(ApplyError::InvalidTarget {
                    reason: reason.clone(),
                });
            }
        };
        let value = converter.convert(raw)?;
        self.slot
            .write(Argument::Value(value))
            .map_err(|reason| ApplyError::WriteFailed { reason })
    }

    /// Re-apply the expression default, if the expression had one
    pub fn apply_default(&self) -> Option<Result<(), ApplyError>> {
        self.default_value.as_deref().map(|raw| self.apply(raw))
    }

    /// Configuration key
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Default value from the placeholder expression
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Fully qualified owner type name
    #[must_use]
    pub fn owner_type(&self) -> &'static str {
        self.owner_type
    }

    /// `<owner type>.<member>` for diagnostics
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Target description
    #[must_use]
    pub fn target(&self) -> &BindTarget {
        &self.target
    }

    /// Target type, or `None` for an invalid target
    #[must_use]
    pub fn type_tag(&self) -> Option<&TypeTag> {
        match &self.target {
            BindTarget::Field(c) | BindTarget::Method(c) => Some(c.tag()),
            BindTarget::Invalid { .. } => None,
        }
    }

    /// Whether the owner still exists
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.slot.is_alive()
    }

    /// Whether this binding writes into `owner`
    #[must_use]
    pub fn is_owned_by<T>(&self, owner: &Arc<RwLock<T>>) -> bool {
        self.slot.owner_addr() == owner_addr(owner)
    }

    pub(crate) fn owner_addr(&self) -> usize {
        self.slot.owner_addr()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("target", &self.target)
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn resolve_target(kind: &MemberKind) -> BindTarget {
    match kind {
        MemberKind::Field(ValueType::Scalar(tag)) => BindTarget::Field(Converter::for_tag(tag)),
        MemberKind::Field(other) => BindTarget::Invalid {
            reason: format!("field of type {other} cannot hold a configuration value"),
        },
        MemberKind::Method(params) => match params.as_slice() {
            [ValueType::Scalar(tag)] => BindTarget::Method(Converter::for_tag(tag)),
            [other] => BindTarget::Invalid {
                reason: format!("parameter of type {other} cannot take a configuration value"),
            },
            _ => BindTarget::Invalid {
                reason: format!("expected 1 parameter, found {}", params.len()),
            },
        },
    }
}

// =============================================================================
// Tests
// =============================================================================
