//! Entity identifiers
//!
//! Ids are 64-bit integers allocated by the store. On the wire they are
//! always decimal strings so that values above 2^53 survive JSON clients
//! that parse numbers as doubles. Deserialization accepts both the string
//! form and a plain JSON integer.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
pub struct EntityId(i64);

impl EntityId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a path segment or payload value is not an id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid id")]
pub struct ParseIdError(pub String);

impl FromStr for EntityId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseIdError(s.to_string()));
        }
        trimmed
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

struct EntityIdVisitor;

impl Visitor<'_> for EntityIdVisitor {
    type Value = EntityId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative integer id as a decimal string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<EntityId, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<EntityId, E> {
        if v < 0 {
            return Err(E::custom(ParseIdError(v.to_string())));
        }
        Ok(EntityId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<EntityId, E> {
        i64::try_from(v)
            .map(EntityId)
            .map_err(|_| E::custom(ParseIdError(v.to_string())))
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(EntityIdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_decimal_string() {
        let id = EntityId::new(9_007_199_254_740_993);
        assert_eq!(serde_json::to_value(id).unwrap(), json!("9007199254740993"));
    }

    #[test]
    fn test_deserializes_from_string_or_number() {
        let from_str: EntityId = serde_json::from_value(json!("42")).unwrap();
        let from_num: EntityId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(from_str, from_num);
    }

    #[test]
    fn test_large_value_roundtrips_exactly() {
        let raw = "9223372036854775807";
        let id: EntityId = raw.parse().unwrap();
        assert_eq!(id.get(), i64::MAX);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", raw));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("abc".parse::<EntityId>().is_err());
        assert!("-5".parse::<EntityId>().is_err());
        assert!("".parse::<EntityId>().is_err());
        assert!(serde_json::from_value::<EntityId>(json!(-1)).is_err());
        assert!(serde_json::from_value::<EntityId>(json!(1.5)).is_err());
    }
}
