//! Boolean conditions attached to files.
//!
//! The grammar is deliberately tiny:
//!
//! | Expression                   | Meaning                                  |
//! |------------------------------|------------------------------------------|
//! | *(empty)*                    | always true                              |
//! | `true` / `false`             | literal                                  |
//! | `!expr`                      | negation (may repeat)                    |
//! | `features.docker`            | dotted path, coerced to a boolean        |
//! | `plugins.includes('testing')`| membership in the list at `plugins`      |
//!
//! Evaluation never fails. Anything that cannot be parsed, and any path that
//! does not resolve, evaluates to false.

use std::fmt;

use serde_json::Value;

use super::entities::TemplateContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Literal(bool),
    Negation(Box<Condition>),
    PathLookup(String),
    MembershipCheck { collection: String, needle: String },
}

impl Condition {
    /// Parse an expression. Total: malformed input becomes `Literal(false)`,
    /// including under a negation, so `!a &&` is false rather than true.
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() {
            return Self::Literal(true);
        }
        Self::parse_term(expr).unwrap_or(Self::Literal(false))
    }

    fn parse_term(expr: &str) -> Option<Self> {
        if let Some(rest) = expr.strip_prefix('!') {
            return match rest.trim() {
                "" => None,
                inner => Self::parse_term(inner).map(|c| Self::Negation(Box::new(c))),
            };
        }
        match expr {
            "true" => return Some(Self::Literal(true)),
            "false" => return Some(Self::Literal(false)),
            _ => {}
        }
        if let Some((collection, needle)) = parse_includes(expr) {
            return Some(Self::MembershipCheck {
                collection: collection.to_string(),
                needle: needle.to_string(),
            });
        }
        is_path(expr).then(|| Self::PathLookup(expr.to_string()))
    }

    pub fn evaluate(&self, ctx: &TemplateContext) -> bool {
        match self {
            Self::Literal(b) => *b,
            Self::Negation(inner) => !inner.evaluate(ctx),
            Self::PathLookup(path) => ctx.lookup(path).is_some_and(is_truthy),
            Self::MembershipCheck { collection, needle } => match ctx.lookup(collection) {
                Some(Value::Array(items)) => items.iter().any(|item| matches_needle(item, needle)),
                Some(Value::String(s)) => s.contains(needle.as_str()),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(b) => write!(f, "{b}"),
            Self::Negation(inner) => write!(f, "!{inner}"),
            Self::PathLookup(path) => f.write_str(path),
            Self::MembershipCheck { collection, needle } => {
                write!(f, "{collection}.includes('{needle}')")
            }
        }
    }
}

/// JavaScript-style truthiness. Empty arrays and objects are truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn matches_needle(item: &Value, needle: &str) -> bool {
    match item {
        Value::String(s) => s == needle,
        Value::Number(n) => n.to_string() == needle,
        Value::Bool(b) => b.to_string() == needle,
        _ => false,
    }
}

/// `collection.includes('needle')` or with double quotes.
fn parse_includes(expr: &str) -> Option<(&str, &str)> {
    let (collection, rest) = expr.split_once(".includes(")?;
    let arg = rest.strip_suffix(')')?.trim();
    let needle = arg
        .strip_prefix('\'')
        .and_then(|a| a.strip_suffix('\''))
        .or_else(|| arg.strip_prefix('"').and_then(|a| a.strip_suffix('"')))?;
    let collection = collection.trim();
    is_path(collection).then_some((collection, needle))
}

fn is_path(s: &str) -> bool {
    !s.is_empty()
        && s.split('.').all(|seg| {
            !seg.is_empty()
                && seg
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$')
        })
}
