//! Reusable field validators
//!
//! Each validator checks one rule and returns a human-readable message on
//! failure. Validators that do not apply to the value's JSON type let it
//! pass; pair them with a type validator (`string`, `integer`, ...).
//! Messages name the field and the rule but never echo the value, so a
//! rejected password is never reflected back.

use crate::core::id::EntityId;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::str::FromStr;
use validator::ValidateEmail;

/// Validator: value must be a string
pub fn string() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_string() {
            Ok(())
        } else {
            Err(format!("'{}' must be a string", field))
        }
    }
}

/// Validator: string must not be empty
pub fn non_empty() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str() {
        Some("") => Err(format!("'{}' must not be empty", field)),
        _ => Ok(()),
    }
}

/// Validator: string length (in characters) must be within range
pub fn string_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if len < min {
                Err(format!("'{}' must have at least {} characters", field, min))
            } else if len > max {
                Err(format!("'{}' must not exceed {} characters", field, max))
            } else {
                Ok(())
            }
        } else {
            Ok(())
        }
    }
}

/// Validator: string must have exactly `len` characters
pub fn exact_length(
    len: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) if s.chars().count() != len => {
            Err(format!("'{}' must have exactly {} characters", field, len))
        }
        _ => Ok(()),
    }
}

/// Validator: string must consist of `min..=max` digits
pub fn digit_count(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) => {
            let len = s.len();
            if !s.bytes().all(|b| b.is_ascii_digit()) || len < min || len > max {
                if min == max {
                    Err(format!("'{}' must contain exactly {} digits", field, min))
                } else {
                    Err(format!("'{}' must contain {} to {} digits", field, min, max))
                }
            } else {
                Ok(())
            }
        }
        None => Ok(()),
    }
}

/// Validator: string must be a valid email address
pub fn email() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str() {
        Some(s) if !s.validate_email() => Err(format!("'{}' must be a valid email", field)),
        _ => Ok(()),
    }
}

/// Validator: string must contain at least one ASCII digit
pub fn contains_digit() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str() {
        Some(s) if !s.chars().any(|c| c.is_ascii_digit()) => {
            Err(format!("'{}' must contain at least one number", field))
        }
        _ => Ok(()),
    }
}

/// Validator: no character may appear three times in a row, ignoring case
pub fn no_triple_repeat() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let folded: Vec<char> = s.chars().flat_map(char::to_lowercase).collect();
        if folded.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
            Err(format!(
                "'{}' must not contain the same character three times in a row",
                field
            ))
        } else {
            Ok(())
        }
    }
}

/// Validator: value must be a JSON integer
pub fn integer() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| {
        if value.is_i64() || value.is_u64() {
            Ok(())
        } else {
            Err(format!("'{}' must be an integer", field))
        }
    }
}

/// Validator: number must be at least `min`
pub fn min_value(min: f64) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_f64() {
        Some(num) if num < min => Err(format!("'{}' must be at least {}", field, min)),
        _ => Ok(()),
    }
}

/// Validator: number must not exceed maximum
pub fn max_value(max: f64) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_f64() {
        Some(num) if num > max => Err(format!("'{}' must not exceed {}", field, max)),
        _ => Ok(()),
    }
}

/// Validator: value must be a decimal number (string form, see `filters::coerce_decimal`)
pub fn decimal() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str().map(BigDecimal::from_str) {
        Some(Ok(_)) => Ok(()),
        _ => Err(format!("'{}' must be a number", field)),
    }
}

/// Validator: decimal must be at least `min`, compared exactly
pub fn decimal_min(
    min: &'static str,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let (Some(Ok(num)), Ok(bound)) = (
            value.as_str().map(BigDecimal::from_str),
            BigDecimal::from_str(min),
        ) else {
            return Ok(());
        };
        if num < bound {
            Err(format!("'{}' must be at least {}", field, min))
        } else {
            Ok(())
        }
    }
}

/// Validator: plain decimal text with bounded digits, like SQL `NUMERIC(p, s)`
///
/// Allows an optional leading `-`, at most `integer_digits` significant
/// digits before the point and `fraction_digits` after it. Exponent forms
/// are rejected, so bounded values stay cheap to compare and sum.
pub fn fixed_point(
    integer_digits: usize,
    fraction_digits: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| {
        let Some(text) = value.as_str() else {
            return Ok(());
        };
        let unsigned = text.strip_prefix('-').unwrap_or(text);
        let (whole, fraction) = match unsigned.split_once('.') {
            Some((whole, fraction)) => (whole, Some(fraction)),
            None => (unsigned, None),
        };
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let whole_ok =
            all_digits(whole) && whole.trim_start_matches('0').len() <= integer_digits;
        let fraction_ok =
            fraction.is_none_or(|f| all_digits(f) && f.len() <= fraction_digits);
        if whole_ok && fraction_ok {
            Ok(())
        } else {
            Err(format!(
                "'{}' must have at most {} digits before and {} after the decimal point",
                field, integer_digits, fraction_digits
            ))
        }
    }
}

/// Validator: value must be in allowed list
pub fn in_list(
    allowed: &'static [&'static str],
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_str() {
        Some(s) if allowed.contains(&s) => Ok(()),
        _ => Err(format!("'{}' must be one of: {}", field, allowed.join(", "))),
    }
}

/// Validator: value must be an id in decimal string form
pub fn entity_id() -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    |field: &str, value: &Value| match value.as_str().map(EntityId::from_str) {
        Some(Ok(_)) => Ok(()),
        _ => Err(format!("'{}' must be a valid id", field)),
    }
}

/// Validator: array must have `min..=max` elements
pub fn array_length(
    min: usize,
    max: usize,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone {
    move |field: &str, value: &Value| match value.as_array() {
        Some(items) if items.len() < min => {
            Err(format!("'{}' must contain at least {} entries", field, min))
        }
        Some(items) if items.len() > max => {
            Err(format!("'{}' must not contain more than {} entries", field, max))
        }
        Some(_) => Ok(()),
        None => Err(must_be_array_message(field)),
    }
}

/// Replace the message of `inner` with a fixed one
pub fn message<F>(
    message: &'static str,
    inner: F,
) -> impl Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone
where
    F: Fn(&str, &Value) -> Result<(), String> + Send + Sync + Clone,
{
    move |field: &str, value: &Value| inner(field, value).map_err(|_| message.to_string())
}

pub(crate) fn must_be_array_message(field: &str) -> String {
    format!("'{}' must be an array", field)
}
