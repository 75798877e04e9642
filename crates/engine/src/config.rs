use recordbox_core::EntitySchema;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::query::{DEFAULT_PAGE_SIZE, PageRequest};
use crate::reconcile::ImportPolicy;

/// Per-store settings. Hosts usually start from `StoreConfig::for_schema`
/// and override individual values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Adapter key holding the whole collection document.
    pub storage_key: String,
    pub page_size: usize,
    pub import_policy: ImportPolicy,
    pub pretty_export: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            storage_key: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            import_policy: ImportPolicy::default(),
            pretty_export: true,
        }
    }
}

impl StoreConfig {
    pub fn for_schema(schema: &EntitySchema) -> Self {
        Self {
            storage_key: schema.storage_key.clone(),
            ..Self::default()
        }
    }

    /// Reads a JSON settings object. Absent keys take their defaults; an
    /// absent or empty `storageKey` falls back to the schema's key.
    pub fn from_json(text: &str, schema: &EntitySchema) -> Result<Self, EngineError> {
        let mut config: StoreConfig = serde_json::from_str(text)
            .map_err(|e| EngineError::Config(format!("unreadable store config: {e}")))?;
        if config.storage_key.trim().is_empty() {
            config.storage_key = schema.storage_key.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.storage_key.trim().is_empty() {
            return Err(EngineError::Config("storage key must not be empty".into()));
        }
        if self.page_size == 0 {
            return Err(EngineError::Config("page size must be at least 1".into()));
        }
        Ok(())
    }

    pub fn page_request(&self, page: usize) -> PageRequest {
        PageRequest::new(page, self.page_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordbox_core::domains;

    #[test]
    fn defaults_follow_schema() {
        let config = StoreConfig::for_schema(&domains::bookings());
        assert_eq!(config.storage_key, "EasyBook.bookings");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.import_policy, ImportPolicy::DropInvalid);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_overrides_and_fills() {
        let config = StoreConfig::from_json(
            r#"{ "pageSize": 25, "importPolicy": "rejectBatch" }"#,
            &domains::tasks(),
        )
        .unwrap();
        assert_eq!(config.storage_key, "quicktasks.tasks");
        assert_eq!(config.page_size, 25);
        assert_eq!(config.import_policy, ImportPolicy::RejectBatch);
        assert!(config.pretty_export);
    }

    #[test]
    fn from_json_rejects_bad_values() {
        let schema = domains::tasks();
        assert!(matches!(
            StoreConfig::from_json(r#"{ "pageSize": 0 }"#, &schema),
            Err(EngineError::Config(_))
        ));
        assert!(matches!(
            StoreConfig::from_json("not json", &schema),
            Err(EngineError::Config(_))
        ));
    }
}
