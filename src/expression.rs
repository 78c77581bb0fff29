//! Placeholder expressions such as `${server.port}:8080`
//!
//! An expression is matched as a whole against the pattern
//! `\$\{(.*)\}:?(.*)`. Capture group 1 is the configuration key, group 2
//! (if present and non-empty) is the default value. Both groups are greedy,
//! so `${a}:${b}` yields the key `a}:${b`; callers that need nested
//! placeholders should supply their own pattern.

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Pattern used when no override is configured
pub const DEFAULT_PATTERN: &str = r"\$\{(.*)\}:?(.*)";

static DEFAULT_MATCHER: LazyLock<ExpressionMatcher> = LazyLock::new(|| ExpressionMatcher {
    regex: anchored(DEFAULT_PATTERN).expect("default expression pattern is valid"),
});

/// A parsed placeholder expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExpression {
    /// Configuration key the expression refers to
    pub key: String,
    /// Text after the closing brace, if any
    pub default_value: Option<String>,
}

impl ValueExpression {
    /// Parse an expression with the default pattern
    ///
    /// Returns `None` if the expression is not a placeholder.
    #[must_use]
    pub fn parse(expression: &str) -> Option<Self> {
        DEFAULT_MATCHER.parse(expression)
    }
}

/// Compiled placeholder pattern
#[derive(Debug, Clone)]
pub struct ExpressionMatcher {
    regex: Regex,
}

impl ExpressionMatcher {
    /// Matcher for [`DEFAULT_PATTERN`]
    #[must_use]
    pub fn standard() -> Self {
        DEFAULT_MATCHER.clone()
    }

    /// Compile a custom pattern
    ///
    /// The pattern must match the whole expression (it is anchored
    /// automatically) and must have at least one capture group, the key.
    /// A second group, when present, is read as the default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidExpressionPattern`] if the pattern does not
    /// compile or has no capture group.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = anchored(pattern).map_err(|e| Error::InvalidExpressionPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        // captures_len counts the implicit whole-match group
        if regex.captures_len() < 2 {
            return Err(Error::InvalidExpressionPattern {
                pattern: pattern.to_string(),
                reason: "pattern must capture the configuration key".to_string(),
            });
        }

        Ok(Self { regex })
    }

    /// Match an expression, extracting key and default
    #[must_use]
    pub fn parse(&self, expression: &str) -> Option<ValueExpression> {
        let caps = self.regex.captures(expression)?;
        let key = caps.get(1)?.as_str().to_string();
        let default_value = caps
            .get(2)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Some(ValueExpression { key, default_value })
    }
}

impl Default for ExpressionMatcher {
    fn default() -> Self {
        Self::standard()
    }
}

fn anchored(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_with_default() {
        let expr = ValueExpression::parse("${my.key}:defaultVal").unwrap();
        assert_eq!(expr.key, "my.key");
        assert_eq!(expr.default_value.as_deref(), Some("defaultVal"));
    }

    #[test]
    fn test_key_without_default() {
        let expr = ValueExpression::parse("${server.port}").unwrap();
        assert_eq!(expr.key, "server.port");
        assert_eq!(expr.default_value, None);

        // Trailing colon with nothing after it is not a default
        let expr = ValueExpression::parse("${server.port}:").unwrap();
        assert_eq!(expr.default_value, None);
    }

    #[test]
    fn test_default_without_colon() {
        let expr = ValueExpression::parse("${timeout}30").unwrap();
        assert_eq!(expr.key, "timeout");
        assert_eq!(expr.default_value.as_deref(), Some("30"));
    }

    #[test]
    fn test_non_placeholder_is_rejected() {
        assert!(ValueExpression::parse("plain.value").is_none());
        assert!(ValueExpression::parse("{my.key}").is_none());
        assert!(ValueExpression::parse("$my.key").is_none());
        assert!(ValueExpression::parse("prefix ${my.key}").is_none());
        assert!(ValueExpression::parse("").is_none());
    }

    #[test]
    fn test_greedy_key_capture() {
        let expr = ValueExpression::parse("${a}:${b}").unwrap();
        assert_eq!(expr.key, "a}:${b");
        assert_eq!(expr.default_value, None);
    }

    #[test]
    fn test_custom_pattern() {
        let matcher = ExpressionMatcher::new(r"\$\{([^:}]+)(?::([^}]*))?\}").unwrap();
        let expr = matcher.parse("${db.url:jdbc:h2}").unwrap();
        assert_eq!(expr.key, "db.url");
        assert_eq!(expr.default_value.as_deref(), Some("jdbc:h2"));

        assert!(matcher.parse("${db.url}:x").is_none());
    }

    #[test]
    fn test_custom_pattern_validation() {
        assert!(matches!(
            ExpressionMatcher::new(r"\$\{.*\}"),
            Err(Error::InvalidExpressionPattern { .. })
        ));
        assert!(matches!(
            ExpressionMatcher::new(r"\$\{(.*"),
            Err(Error::InvalidExpressionPattern { .. })
        ));
    }
}
