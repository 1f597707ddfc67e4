//! SQL text helpers for identifiers and inline literals.
//!
//! # Invariants
//! - Identifiers are accepted only when they match `[A-Za-z_][A-Za-z0-9_]*`
//!   (optionally `table.column`); nothing else is interpolated as a name.
//! - Inline text literals double embedded single quotes.

use crate::error::{KitError, KitResult};
use crate::model::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern is valid")
});

/// Returns `name` when it is safe to splice into SQL text.
pub fn identifier(name: &str) -> KitResult<&str> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(KitError::InvalidIdentifier(name.to_string()))
    }
}

/// Renders `value` as an inline SQL literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(value) => value.to_string(),
        Value::Real(value) => value.to_string(),
        Value::Text(text) => format!("'{}'", text.replace('\'', "''")),
    }
}

/// Escapes `%`, `_` and `\` so a value matches literally inside `LIKE`.
pub fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Returns `count` comma-separated `?` placeholders.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
