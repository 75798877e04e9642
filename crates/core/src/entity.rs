use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::field_value::FieldValue;
use crate::ids::EntityId;
use crate::timestamp::Timestamp;
use crate::CoreError;

/// Domain attributes of a record, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

pub const KEY_ID: &str = "id";
pub const KEY_CREATED_AT: &str = "createdAt";
pub const KEY_UPDATED_AT: &str = "updatedAt";

/// Keys owned by the store; they never appear inside `Entity::fields`.
pub const RESERVED_KEYS: [&str; 3] = [KEY_ID, KEY_CREATED_AT, KEY_UPDATED_AT];

/// One user record. Serialized flat: `{"id", "createdAt", "updatedAt", ...fields}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Entity {
    pub fn new(id: EntityId, fields: Fields, at: Timestamp) -> Self {
        Self {
            id,
            created_at: at,
            updated_at: at,
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_text)
    }

    /// Reads one record of an exported or stored document.
    ///
    /// `id` is mandatory. Missing timestamps default to `now`; integer
    /// timestamps are read as epoch milliseconds. An `updatedAt` earlier
    /// than `createdAt` is raised to `createdAt`.
    pub fn from_json(value: serde_json::Value, now: Timestamp) -> Result<Self, CoreError> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(CoreError::Serialization("record is not an object".into()));
        };

        let id = EntityId::from_json(&map.remove(KEY_ID).unwrap_or(serde_json::Value::Null))?;
        let created_at = read_timestamp(map.remove(KEY_CREATED_AT), KEY_CREATED_AT)?.unwrap_or(now);
        let updated_at = read_timestamp(map.remove(KEY_UPDATED_AT), KEY_UPDATED_AT)?
            .unwrap_or(created_at)
            .max(created_at);

        let fields = map
            .into_iter()
            .map(|(k, v)| (k, FieldValue::from_json(v)))
            .collect();

        Ok(Self {
            id,
            created_at,
            updated_at,
            fields,
        })
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        serde_json::to_value(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

fn read_timestamp(
    raw: Option<serde_json::Value>,
    key: &str,
) -> Result<Option<Timestamp>, CoreError> {
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Timestamp::parse(&s).map(Some),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(ms) => Timestamp::from_millis(ms).map(Some),
            None => Err(CoreError::InvalidTimestamp(format!("`{key}` is not an integer: {n}"))),
        },
        Some(other) => Err(CoreError::InvalidTimestamp(format!("`{key}` has unexpected value {other}"))),
    }
}
