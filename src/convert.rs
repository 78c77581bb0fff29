//! Value conversion from raw configuration strings
//!
//! Every binding target has a [`TypeTag`]. The converter for that tag is a
//! plain function pointer, resolved once when the binding is created:
//!
//! | Tag       | Accepted input                                              |
//! |-----------|-------------------------------------------------------------|
//! | `Int`     | base-10 `i32`, optional leading sign, nothing else          |
//! | `Long`    | base-10 `i64`                                               |
//! | `Short`   | base-10 integer that fits in `i16`                          |
//! | `Double`  | decimal or exponent `f64`, plus `inf`/`infinity`/`nan`      |
//! | `Float`   | decimal or exponent `f32`, plus `inf`/`infinity`/`nan`      |
//! | `Boolean` | `true`/`yes`/`on`/`1` or `false`/`no`/`off`/`0`, any case   |
//! | `Date`    | ISO-8601 calendar date, `YYYY-MM-DD`                        |
//! | `String`  | anything                                                    |
//! | `Other`   | anything, passed through unchanged as a string              |
//!
//! The non-finite float tokens take an optional sign and match in any case.
//! Conversion is pure: no locale, no time zone, no surrounding whitespace
//! trimming.

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::Date;
use time::macros::format_description;

/// Tokens accepted as `true` by the boolean converter (ASCII case-insensitive)
pub const TRUTHY_TOKENS: &[&str] = &["true", "yes", "on", "1"];

/// Tokens accepted as `false` by the boolean converter (ASCII case-insensitive)
pub const FALSY_TOKENS: &[&str] = &["false", "no", "off", "0"];

/// Target type of a binding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Int,
    Long,
    Short,
    Double,
    Float,
    Boolean,
    Date,
    String,
    /// A type without a converter; receives the raw string
    Other(String),
}

impl TypeTag {
    /// Whether a dedicated converter exists for this tag
    #[must_use]
    pub fn has_converter(&self) -> bool {
        !matches!(self, TypeTag::Other(_))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Int => f.write_str("int"),
            TypeTag::Long => f.write_str("long"),
            TypeTag::Short => f.write_str("short"),
            TypeTag::Double => f.write_str("double"),
            TypeTag::Float => f.write_str("float"),
            TypeTag::Boolean => f.write_str("boolean"),
            TypeTag::Date => f.write_str("date"),
            TypeTag::String => f.write_str("string"),
            TypeTag::Other(name) => f.write_str(name),
        }
    }
}

/// A converted configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Short(i16),
    Double(f64),
    Float(f32),
    Boolean(bool),
    Date(Date),
    String(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Short(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
            Value::String(v) => f.write_str(v),
        }
    }
}

type ConvertFn = fn(&str) -> Result<Value, ConversionError>;

/// Converter resolved for one [`TypeTag`]
///
/// Cheap to clone; bindings keep one for their whole lifetime.
#[derive(Clone)]
pub struct Converter {
    tag: TypeTag,
    convert: ConvertFn,
}

impl Converter {
    /// Resolve the converter for a tag
    #[must_use]
    pub fn for_tag(tag: &TypeTag) -> Self {
        let convert: ConvertFn = match tag {
            TypeTag::Int => to_int,
            TypeTag::Long => to_long,
            TypeTag::Short => to_short,
            TypeTag::Double => to_double,
            TypeTag::Float => to_float,
            TypeTag::Boolean => to_boolean,
            TypeTag::Date => to_date,
            TypeTag::String | TypeTag::Other(_) => pass_through,
        };
        Self {
            tag: tag.clone(),
            convert,
        }
    }

    /// The tag this converter was resolved for
    #[must_use]
    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Convert a raw string
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if `raw` is not a valid encoding of the tag.
    pub fn convert(&self, raw: &str) -> Result<Value, ConversionError> {
        (self.convert)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").field("tag", &self.tag).finish()
    }
}

/// Convert a raw string to the value type named by `tag`
///
/// Tags without a converter return the raw string unchanged.
///
/// # Errors
///
/// Returns [`ConversionError`] if `raw` is not a valid encoding of `tag`.
pub fn convert(raw: &str, tag: &TypeTag) -> Result<Value, ConversionError> {
    Converter::for_tag(tag).convert(raw)
}

fn to_int(raw: &str) -> Result<Value, ConversionError> {
    raw.parse::<i32>()
        .map(Value::Int)
        .map_err(|e| ConversionError::new(raw, TypeTag::Int, e.to_string()))
}

fn to_long(raw: &str) -> Result<Value, ConversionError> {
    raw.parse::<i64>()
        .map(Value::Long)
        .map_err(|e| ConversionError::new(raw, TypeTag::Long, e.to_string()))
}

fn to_short(raw: &str) -> Result<Value, ConversionError> {
    let wide = raw
        .parse::<i64>()
        .map_err(|e| ConversionError::new(raw, TypeTag::Short, e.to_string()))?;
    i16::try_from(wide).map(Value::Short).map_err(|_| {
        ConversionError::new(
            raw,
            TypeTag::Short,
            format!("value out of range [{}, {}]", i16::MIN, i16::MAX),
        )
    })
}

fn to_double(raw: &str) -> Result<Value, ConversionError> {
    raw.parse::<f64>()
        .map(Value::Double)
        .map_err(|e| ConversionError::new(raw, TypeTag::Double, e.to_string()))
}

fn to_float(raw: &str) -> Result<Value, ConversionError> {
    raw.parse::<f32>()
        .map(Value::Float)
        .map_err(|e| ConversionError::new(raw, TypeTag::Float, e.to_string()))
}

fn to_boolean(raw: &str) -> Result<Value, ConversionError> {
    if TRUTHY_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t)) {
        Ok(Value::Boolean(true))
    } else if FALSY_TOKENS.iter().any(|t| raw.eq_ignore_ascii_case(t)) {
        Ok(Value::Boolean(false))
    } else {
        Err(ConversionError::new(
            raw,
            TypeTag::Boolean,
            format!(
                "expected one of {} or {}",
                TRUTHY_TOKENS.join("/"),
                FALSY_TOKENS.join("/")
            ),
        ))
    }
}

fn to_date(raw: &str) -> Result<Value, ConversionError> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map(Value::Date)
        .map_err(|e| ConversionError::new(raw, TypeTag::Date, e.to_string()))
}

fn pass_through(raw: &str) -> Result<Value, ConversionError> {
    Ok(Value::String(raw.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn test_integer_conversions() {
        assert_eq!(convert("42", &TypeTag::Int).unwrap(), Value::Int(42));
        assert_eq!(convert("-7", &TypeTag::Int).unwrap(), Value::Int(-7));
        assert_eq!(convert("+7", &TypeTag::Int).unwrap(), Value::Int(7));
        assert_eq!(
            convert("9000000000", &TypeTag::Long).unwrap(),
            Value::Long(9_000_000_000)
        );

        assert!(convert("9000000000", &TypeTag::Int).is_err());
        assert!(convert("4 2", &TypeTag::Int).is_err());
        assert!(convert(" 42", &TypeTag::Int).is_err());
        assert!(convert("42abc", &TypeTag::Long).is_err());
        assert!(convert("", &TypeTag::Int).is_err());
    }

    #[test]
    fn test_short_range_check() {
        assert_eq!(
            convert("32767", &TypeTag::Short).unwrap(),
            Value::Short(i16::MAX)
        );
        assert_eq!(
            convert("-32768", &TypeTag::Short).unwrap(),
            Value::Short(i16::MIN)
        );

        let err = convert("32768", &TypeTag::Short).unwrap_err();
        assert_eq!(err.target, TypeTag::Short);
        assert!(err.reason.contains("out of range"));

        assert!(convert("short", &TypeTag::Short).is_err());
    }

    #[test]
    fn test_boolean_tokens() {
        for token in ["true", "TRUE", "True", "yes", "ON", "1"] {
            assert_eq!(
                convert(token, &TypeTag::Boolean).unwrap(),
                Value::Boolean(true),
                "{token}"
            );
        }
        for token in ["false", "FALSE", "no", "Off", "0"] {
            assert_eq!(
                convert(token, &TypeTag::Boolean).unwrap(),
                Value::Boolean(false),
                "{token}"
            );
        }
        for token in ["", "tru", "2", "y", " true"] {
            assert!(convert(token, &TypeTag::Boolean).is_err(), "{token}");
        }
    }

    #[test]
    fn test_float_conversions() {
        match convert("2.75", &TypeTag::Double).unwrap() {
            Value::Double(v) => assert!((v - 2.75).abs() < f64::EPSILON),
            other => panic!("unexpected {other:?}"),
        }
        match convert("2.5", &TypeTag::Float).unwrap() {
            Value::Float(v) => assert!((v - 2.5).abs() < f32::EPSILON),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(convert("1e3", &TypeTag::Double).unwrap(), Value::Double(1000.0));

        assert!(convert("2.75abc", &TypeTag::Double).is_err());
        assert!(convert("infinite", &TypeTag::Double).is_err());
        assert!(convert("1.0f", &TypeTag::Float).is_err());
        assert!(convert("", &TypeTag::Double).is_err());
    }

    #[test]
    fn test_non_finite_float_tokens() {
        assert_eq!(convert("inf", &TypeTag::Double).unwrap(), Value::Double(f64::INFINITY));
        assert_eq!(
            convert("-Infinity", &TypeTag::Double).unwrap(),
            Value::Double(f64::NEG_INFINITY)
        );
        assert_eq!(convert("INF", &TypeTag::Float).unwrap(), Value::Float(f32::INFINITY));
        match convert("NaN", &TypeTag::Float).unwrap() {
            Value::Float(v) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
        match convert("nan", &TypeTag::Double).unwrap() {
            Value::Double(v) => assert!(v.is_nan()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_date_conversion() {
        let expected = Date::from_calendar_date(2024, Month::February, 29).unwrap();
        assert_eq!(
            convert("2024-02-29", &TypeTag::Date).unwrap(),
            Value::Date(expected)
        );

        assert!(convert("2023-02-29", &TypeTag::Date).is_err());
        assert!(convert("29/02/2024", &TypeTag::Date).is_err());
        assert!(convert("20240229", &TypeTag::Date).is_err());
        assert!(convert("2024-02-29T10:00:00", &TypeTag::Date).is_err());
    }

    #[test]
    fn test_string_and_unknown_pass_through() {
        assert_eq!(
            convert("  spaced  ", &TypeTag::String).unwrap(),
            Value::String("  spaced  ".into())
        );
        assert_eq!(
            convert("whatever", &TypeTag::Other("Duration".into())).unwrap(),
            Value::String("whatever".into())
        );
        assert!(!TypeTag::Other("Duration".into()).has_converter());
        assert!(TypeTag::Int.has_converter());
    }

    #[test]
    fn test_converter_is_resolved_once() {
        let converter = Converter::for_tag(&TypeTag::Long);
        assert_eq!(converter.tag(), &TypeTag::Long);
        assert_eq!(converter.convert("5").unwrap(), Value::Long(5));
        assert!(converter.convert("five").is_err());
    }
}
