//! Reusable field filters
//!
//! These filters transform field values before validation. A filter that
//! does not apply to the value's type passes it through untouched and leaves
//! the type check to the validators.

use anyhow::{Result, anyhow};
use bigdecimal::BigDecimal;
use regex::Regex;
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::LazyLock;

static NON_DIGIT: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(r"\D"));

/// Filter: trim whitespace from string
pub fn trim() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            Ok(Value::String(s.trim().to_string()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: convert string to uppercase
pub fn uppercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            Ok(Value::String(s.to_uppercase()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: convert string to lowercase
pub fn lowercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            Ok(Value::String(s.to_lowercase()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: strip every non-digit character (`"(11) 98765-4321"` → `"11987654321"`)
pub fn digits_only() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            let pattern = NON_DIGIT
                .as_ref()
                .map_err(|e| anyhow!("Invalid digit pattern: {}", e))?;
            Ok(Value::String(pattern.replace_all(s, "").into_owned()))
        } else {
            Ok(value)
        }
    }
}

/// Filter: turn a numeric string or JSON number into a canonical decimal string
///
/// The string form keeps the exact value for `BigDecimal` deserialization.
/// Unparseable strings pass through for the `decimal` validator to reject.
pub fn coerce_decimal() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::String(s) if BigDecimal::from_str(s.trim()).is_ok() => {
            Ok(Value::String(s.trim().to_string()))
        }
        other => Ok(other),
    }
}

/// Filter: turn an integer-looking string into a JSON integer
pub fn coerce_integer() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| {
        if let Some(s) = value.as_str() {
            match s.trim().parse::<i64>() {
                Ok(n) => Ok(json!(n)),
                Err(_) => Ok(value),
            }
        } else {
            Ok(value)
        }
    }
}

/// Filter: render an id given as a JSON integer in its decimal string form
pub fn coerce_id() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::Number(n) if n.is_u64() || n.is_i64() => Ok(Value::String(n.to_string())),
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Ok(other),
    }
}
