use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::CoreError;

pub const MAX_ID_LEN: usize = 128;

/// Opaque record identifier, unique within one store.
///
/// Fresh ids are UUIDv7 strings. Imported ids keep whatever shape the
/// exporting app chose (`bk_1700000000000`, `r-...`, plain digits).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if raw.is_empty() {
            return Err(CoreError::InvalidId("id is empty".into()));
        }
        if raw.trim() != raw {
            return Err(CoreError::InvalidId(format!(
                "id `{raw}` has surrounding whitespace"
            )));
        }
        if raw.chars().count() > MAX_ID_LEN {
            return Err(CoreError::InvalidId(format!(
                "id exceeds {MAX_ID_LEN} characters"
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Accepts the id shapes seen in exported documents: strings and
    /// integer ids produced by millisecond timestamps.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CoreError> {
        match value {
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Number(n) if n.is_i64() || n.is_u64() => Self::parse(&n.to_string()),
            serde_json::Value::Null => Err(CoreError::InvalidId("id is missing".into())),
            other => Err(CoreError::InvalidId(format!("id must be a string, got {other}"))),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_unique() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn parse_rejects_blank_and_padded() {
        assert!(EntityId::parse("").is_err());
        assert!(EntityId::parse(" bk_1").is_err());
        assert!(EntityId::parse(&"x".repeat(MAX_ID_LEN + 1)).is_err());
        assert_eq!(EntityId::parse("bk_1").unwrap().as_str(), "bk_1");
    }

    #[test]
    fn numeric_json_ids_become_strings() {
        let id = EntityId::from_json(&serde_json::json!(1700000000000u64)).unwrap();
        assert_eq!(id.as_str(), "1700000000000");
        assert!(EntityId::from_json(&serde_json::json!(1.5)).is_err());
        assert!(EntityId::from_json(&serde_json::json!(true)).is_err());
    }
}
