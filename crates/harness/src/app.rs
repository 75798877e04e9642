use recordbox_core::{Clock, CoreError, EntitySchema, Timestamp};
use recordbox_engine::{EngineError, EntityStore, StoreConfig};
use recordbox_storage::{MemoryAdapter, PersistenceAdapter};

/// Instant every `TestApp` clock starts at.
pub const START: &str = "2025-01-01T09:00:00.000Z";

/// `START` as epoch milliseconds.
const START_MILLIS: i64 = 1_735_722_000_000;

/// One sample app: a store over an in-memory adapter with a manual clock,
/// so timestamps in assertions are exact.
pub struct TestApp {
    pub store: EntityStore<MemoryAdapter>,
}

impl TestApp {
    pub fn new(schema: EntitySchema) -> Result<Self, EngineError> {
        Self::with_adapter(schema, MemoryAdapter::new())
    }

    pub fn with_adapter(schema: EntitySchema, adapter: MemoryAdapter) -> Result<Self, EngineError> {
        let config = StoreConfig::for_schema(&schema);
        let clock = Clock::manual(Self::start()?);
        let store = EntityStore::open_with_clock(schema, adapter, config, clock)?;
        Ok(Self { store })
    }

    pub fn start() -> Result<Timestamp, CoreError> {
        Timestamp::from_millis(START_MILLIS)
    }

    pub fn advance_minutes(&mut self, minutes: i64) {
        self.store.clock_mut().advance(chrono::Duration::minutes(minutes));
    }

    /// The document currently held by the adapter, decoded.
    pub fn persisted(&self) -> Option<serde_json::Value> {
        let key = &self.store.config().storage_key;
        let raw = self.store.adapter().read(key).ok()??;
        serde_json::from_str(&raw).ok()
    }

    /// Simulates a page reload: a fresh store over the same adapter contents.
    pub fn reopen(self) -> Result<Self, EngineError> {
        let schema = self.store.schema().clone();
        let adapter = self.store.into_adapter();
        Self::with_adapter(schema, adapter)
    }
}
