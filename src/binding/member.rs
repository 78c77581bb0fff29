//! Member descriptors: the statically generated replacement for reflection
//!
//! A [`Bindable`] type lists its interesting fields and methods as
//! [`Member`]s. Each member carries its declared type(s), its annotations,
//! and an accessor closure that writes into (or calls a method on) an owner.
//! `#[derive(Bindable)]` generates these; they can also be written by hand.

use crate::convert::{TypeTag, Value};
use crate::source::{ChangeEvent, Config};
use std::fmt;
use std::sync::Arc;
use time::Date;

/// Argument handed to a member accessor
pub enum Argument<'a> {
    /// A converted configuration value
    Value(Value),
    /// A whole configuration namespace (one-time injection)
    Config(Config),
    /// A change event (listener methods)
    Event(&'a ChangeEvent),
    /// Withdraw an earlier injection; `Option` fields go back to `None`
    Unset,
}

impl Argument<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Argument::Value(_) => "value",
            Argument::Config(_) => "config",
            Argument::Event(_) => "change event",
            Argument::Unset => "unset",
        }
    }
}

/// Writes an argument into a member of `T`
///
/// Returning `Err` marks the write as failed; the message ends up in the
/// apply error and the log.
pub type Accessor<T> = Arc<dyn Fn(&mut T, Argument<'_>) -> Result<(), String> + Send + Sync>;

/// Declared type of a field or method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// A type a raw string can be converted to
    Scalar(TypeTag),
    /// A configuration namespace handle
    Config,
    /// A change event
    ChangeEvent,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Scalar(tag) => write!(f, "{tag}"),
            ValueType::Config => f.write_str("Config"),
            ValueType::ChangeEvent => f.write_str("ChangeEvent"),
        }
    }
}

/// Marker attached to a member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Bind to a placeholder expression such as `${server.port}:8080`
    Value(String),
    /// Inject the named namespace once
    Config(String),
    /// Invoke on every change event of the listed namespaces
    ChangeListener(Vec<String>),
}

/// Field or method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKind {
    Field(ValueType),
    Method(Vec<ValueType>),
}

/// One declared member of a bindable type
pub struct Member<T> {
    name: String,
    kind: MemberKind,
    annotations: Vec<Annotation>,
    accessor: Accessor<T>,
}

impl<T> Member<T> {
    /// Describe a field
    pub fn field<F>(name: impl Into<String>, ty: ValueType, accessor: F) -> Self
    where
        F: Fn(&mut T, Argument<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: MemberKind::Field(ty),
            annotations: Vec::new(),
            accessor: Arc::new(accessor),
        }
    }

    /// Describe a method with the given parameter types
    ///
    /// Only single-parameter methods can be invoked; others are accepted
    /// here and rejected (or degraded) during discovery.
    pub fn method<F>(name: impl Into<String>, params: Vec<ValueType>, accessor: F) -> Self
    where
        F: Fn(&mut T, Argument<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: MemberKind::Method(params),
            annotations: Vec::new(),
            accessor: Arc::new(accessor),
        }
    }

    /// Attach an annotation
    #[must_use]
    pub fn annotated(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Shorthand for `annotated(Annotation::Value(expr))`
    #[must_use]
    pub fn value(self, expression: impl Into<String>) -> Self {
        self.annotated(Annotation::Value(expression.into()))
    }

    /// Member name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field or method, with declared types
    #[must_use]
    pub fn kind(&self) -> &MemberKind {
        &self.kind
    }

    /// Annotations, in declaration order
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Whether this is a method
    #[must_use]
    pub fn is_method(&self) -> bool {
        matches!(self.kind, MemberKind::Method(_))
    }

    /// Name as shown in diagnostics: `field` or `method(..)`
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            MemberKind::Field(_) => self.name.clone(),
            MemberKind::Method(_) => format!("{}(..)", self.name),
        }
    }

    pub(crate) fn accessor(&self) -> Accessor<T> {
        Arc::clone(&self.accessor)
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("annotations", &self.annotations)
            .finish_non_exhaustive()
    }
}

/// A type whose members can be bound to configuration
pub trait Bindable: Send + Sync + Sized + 'static {
    /// All declared members relevant to binding
    fn members() -> Vec<Member<Self>>;
}

/// A Rust type that can be the target of a binding
///
/// Implemented for the scalar types with converters, for [`Config`], and
/// for `Option<T>`. Implement it for your own types with
/// `ValueType::Scalar(TypeTag::Other(..))` to receive the raw string.
pub trait BindValue: Sized {
    /// Declared type used to pick a converter
    fn value_type() -> ValueType;

    /// Extract the value from an accessor argument
    fn from_argument(arg: Argument<'_>) -> Result<Self, String>;
}

macro_rules! scalar_bind_value {
    ($($ty:ty => $tag:ident),* $(,)?) => {
        $(
            impl BindValue for $ty {
                fn value_type() -> ValueType {
                    ValueType::Scalar(TypeTag::$tag)
                }

                fn from_argument(arg: Argument<'_>) -> Result<Self, String> {
                    match arg {
                        Argument::Value(Value::$tag(v)) => Ok(v),
                        other => Err(mismatch(stringify!($ty), &other)),
                    }
                }
            }
        )*
    };
}

scalar_bind_value! {
    i32 => Int,
    i64 => Long,
    i16 => Short,
    f64 => Double,
    f32 => Float,
    bool => Boolean,
    Date => Date,
    String => String,
}

impl BindValue for Config {
    fn value_type() -> ValueType {
        ValueType::Config
    }

    fn from_argument(arg: Argument<'_>) -> Result<Self, String> {
        match arg {
            Argument::Config(config) => Ok(config),
            other => Err(mismatch("Config", &other)),
        }
    }
}

impl<T: BindValue> BindValue for Option<T> {
    fn value_type() -> ValueType {
        T::value_type()
    }

    fn from_argument(arg: Argument<'_>) -> Result<Self, String> {
        match arg {
            Argument::Unset => Ok(None),
            other => T::from_argument(other).map(Some),
        }
    }
}

fn mismatch(expected: &str, arg: &Argument<'_>) -> String {
    match arg {
        Argument::Value(value) => format!("expected {expected}, got value {value:?}"),
        other => format!("expected {expected}, got {}", other.describe()),
    }
}

/// Return types accepted from setter methods
///
/// `()` always succeeds; `Result<(), E>` turns `Err` into a failed write.
pub trait SetterOutcome {
    fn into_outcome(self) -> Result<(), String>;
}

impl SetterOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> SetterOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Pool {
        size: i32,
        label: Option<String>,
    }

    #[test]
    fn test_scalar_extraction() {
        assert_eq!(i32::from_argument(Argument::Value(Value::Int(4))), Ok(4));
        assert_eq!(
            Option::<String>::from_argument(Argument::Value(Value::String("x".into()))),
            Ok(Some("x".to_string()))
        );
        assert_eq!(
            <Option<i64>>::value_type(),
            ValueType::Scalar(TypeTag::Long)
        );

        let err = i32::from_argument(Argument::Value(Value::Long(4))).unwrap_err();
        assert!(err.contains("expected i32"));
    }

    #[test]
    fn test_unset_clears_optional_targets() {
        assert_eq!(Option::<i32>::from_argument(Argument::Unset), Ok(None));
        let err = i32::from_argument(Argument::Unset).unwrap_err();
        assert!(err.contains("got unset"));
    }

    #[test]
    fn test_field_accessor_writes_owner() {
        let member = Member::<Pool>::field("size", i32::value_type(), |owner, arg| {
            owner.size = i32::from_argument(arg)?;
            Ok(())
        })
        .value("${pool.size}:4");

        let mut pool = Pool::default();
        (member.accessor())(&mut pool, Argument::Value(Value::Int(16))).unwrap();
        assert_eq!(pool.size, 16);
        assert_eq!(member.annotations(), &[Annotation::Value("${pool.size}:4".into())]);
        assert_eq!(member.display_name(), "size");
        assert!(!member.is_method());
    }

    #[test]
    fn test_method_display_name() {
        let member = Member::<Pool>::method(
            "set_label",
            vec![Option::<String>::value_type()],
            |owner, arg| {
                owner.label = Option::<String>::from_argument(arg)?;
                Ok(())
            },
        );
        assert_eq!(member.display_name(), "set_label(..)");
        assert!(member.is_method());
    }

    #[test]
    fn test_setter_outcome() {
        assert_eq!(().into_outcome(), Ok(()));
        let failed: Result<(), String> = Err("pool is closed".into());
        assert_eq!(failed.into_outcome(), Err("pool is closed".to_string()));
    }
}
