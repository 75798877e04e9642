use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use recordbox_core::{Clock, Entity, EntityId, EntitySchema, Fields};
use recordbox_storage::PersistenceAdapter;

use crate::config::StoreConfig;
use crate::conflict::{ConflictWarning, detect};
use crate::error::EngineError;
use crate::query::{self, FieldRef, Page, Query, Summary};
use crate::reconcile::{self, ImportMode, ImportReport, Reconciled};

/// What the caller wants done when a write collides with an active record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    /// Fail with `EngineError::Conflict`; nothing is written.
    #[default]
    Abort,
    /// Write anyway; the warning is returned alongside the result.
    Proceed,
}

/// The durable copy could not be written. The in-memory collection still
/// holds the change and keeps serving reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceWarning {
    pub key: String,
    pub message: String,
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "changes to `{}` were not saved: {}", self.key, self.message)
    }
}

/// Result of a mutation that was applied in memory, with its side-channel
/// warnings.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub conflict: Option<ConflictWarning>,
    pub persistence: Option<PersistenceWarning>,
}

impl<T> Committed<T> {
    fn new(value: T, conflict: Option<ConflictWarning>, persistence: Option<PersistenceWarning>) -> Self {
        Self {
            value,
            conflict,
            persistence,
        }
    }

    pub fn is_durable(&self) -> bool {
        self.persistence.is_none()
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub document: String,
    /// blake3 hex digest of `document`.
    pub digest: String,
    pub count: usize,
}

/// Owns one domain collection and mirrors every mutation to its adapter.
pub struct EntityStore<A: PersistenceAdapter> {
    schema: EntitySchema,
    config: StoreConfig,
    adapter: A,
    clock: Clock,
    entities: Vec<Entity>,
}

impl<A: PersistenceAdapter> EntityStore<A> {
    pub fn open(schema: EntitySchema, adapter: A, config: StoreConfig) -> Result<Self, EngineError> {
        Self::open_with_clock(schema, adapter, config, Clock::system())
    }

    /// Loads the collection stored under the configured key. Stored records
    /// that no longer validate are skipped.
    pub fn open_with_clock(
        schema: EntitySchema,
        adapter: A,
        config: StoreConfig,
        mut clock: Clock,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let entities = match adapter.read(&config.storage_key)? {
            None => Vec::new(),
            Some(document) => load_document(&document, &schema, &mut clock)?,
        };
        info!(
            "event=store_open module=store collection={} key={} records={}",
            schema.name,
            config.storage_key,
            entities.len()
        );
        Ok(Self {
            schema,
            config,
            adapter,
            clock,
            entities,
        })
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Insertion-ordered, read-only view of the collection.
    pub fn list(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn query(&self, query: &Query) -> Page<'_> {
        query::view(&self.entities, query)
    }

    pub fn summarize(&self, query: &Query, group_field: &FieldRef, sum_field: &FieldRef) -> Summary {
        query::summarize(&self.entities, query, group_field, sum_field)
    }

    /// Pre-flight check for a create (`exclude = None`) or an update of
    /// `exclude`. Always `None` for domains without a uniqueness rule.
    pub fn check_conflict(&self, fields: &Fields, exclude: Option<&EntityId>) -> Option<ConflictWarning> {
        let rule = self.schema.conflict.as_ref()?;
        detect(rule, &self.entities, fields, exclude)
    }

    /// blake3 hex digest of the serialized collection.
    pub fn fingerprint(&self) -> Result<String, EngineError> {
        let canonical = serde_json::to_string(&self.entities)
            .map_err(|e| EngineError::Parse(format!("collection is not serializable: {e}")))?;
        Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn create(&mut self, fields: Fields) -> Result<Committed<Entity>, EngineError> {
        self.create_with(fields, OnConflict::Abort)
    }

    pub fn create_with(&mut self, fields: Fields, on_conflict: OnConflict) -> Result<Committed<Entity>, EngineError> {
        let fields = self.schema.prepare(fields)?;
        let conflict = self.check_conflict(&fields, None);
        if let (Some(warning), OnConflict::Abort) = (&conflict, on_conflict) {
            return Err(EngineError::Conflict(warning.clone()));
        }

        let mut id = EntityId::new();
        while self.get(&id).is_some() {
            id = EntityId::new();
        }
        let now = self.clock.tick();
        let entity = Entity::new(id, fields, now);
        self.entities.push(entity.clone());
        info!(
            "event=entity_create module=store collection={} id={} conflict={}",
            self.schema.name,
            entity.id,
            conflict.is_some()
        );

        let persistence = self.persist();
        Ok(Committed::new(entity, conflict, persistence))
    }

    pub fn update(&mut self, id: &EntityId, patch: Fields) -> Result<Committed<Entity>, EngineError> {
        self.update_with(id, patch, OnConflict::Abort)
    }

    /// Merges `patch` over the record. A `Null` value removes that field;
    /// reserved keys in the patch are ignored.
    pub fn update_with(
        &mut self,
        id: &EntityId,
        patch: Fields,
        on_conflict: OnConflict,
    ) -> Result<Committed<Entity>, EngineError> {
        let idx = self
            .entities
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;

        let mut merged = self.entities[idx].fields.clone();
        for (key, value) in patch {
            if value.is_null() {
                merged.remove(&key);
            } else {
                merged.insert(key, value);
            }
        }
        let merged = self.schema.prepare(merged)?;

        let conflict = self.check_conflict(&merged, Some(id));
        if let (Some(warning), OnConflict::Abort) = (&conflict, on_conflict) {
            return Err(EngineError::Conflict(warning.clone()));
        }

        let now = self.clock.tick();
        let entity = &mut self.entities[idx];
        entity.fields = merged;
        entity.updated_at = now.max(entity.updated_at);
        let updated = entity.clone();
        info!(
            "event=entity_update module=store collection={} id={} conflict={}",
            self.schema.name,
            updated.id,
            conflict.is_some()
        );

        let persistence = self.persist();
        Ok(Committed::new(updated, conflict, persistence))
    }

    /// Removes the record if present. Deleting an absent id changes nothing
    /// and writes nothing.
    pub fn delete(&mut self, id: &EntityId) -> Committed<bool> {
        let Some(idx) = self.entities.iter().position(|e| &e.id == id) else {
            debug!("event=entity_delete module=store collection={} id={} removed=false", self.schema.name, id);
            return Committed::new(false, None, None);
        };
        self.entities.remove(idx);
        info!("event=entity_delete module=store collection={} id={} removed=true", self.schema.name, id);
        let persistence = self.persist();
        Committed::new(true, None, persistence)
    }

    /// Removes every record. Returns how many were removed.
    pub fn clear(&mut self) -> Committed<usize> {
        let removed = self.entities.len();
        self.entities.clear();
        info!("event=store_clear module=store collection={} removed={}", self.schema.name, removed);
        let persistence = self.persist();
        Committed::new(removed, None, persistence)
    }

    // ========================================================================
    // Import / export
    // ========================================================================

    pub fn export(&self) -> Result<Export, EngineError> {
        let encoded = if self.config.pretty_export {
            serde_json::to_string_pretty(&self.entities)
        } else {
            serde_json::to_string(&self.entities)
        };
        let document = encoded.map_err(|e| EngineError::Parse(format!("collection is not serializable: {e}")))?;
        let digest = blake3::hash(document.as_bytes()).to_hex().to_string();
        info!(
            "event=export module=store collection={} records={} digest={}",
            self.schema.name,
            self.entities.len(),
            &digest[..16]
        );
        Ok(Export {
            document,
            digest,
            count: self.entities.len(),
        })
    }

    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<Export, EngineError> {
        let export = self.export()?;
        std::fs::write(path.as_ref(), &export.document)?;
        Ok(export)
    }

    /// Imports with conflicts reported but not blocking.
    pub fn import(&mut self, payload: &str, mode: ImportMode) -> Result<Committed<ImportReport>, EngineError> {
        self.import_with(payload, mode, OnConflict::Proceed)
    }

    /// All-or-nothing: on any error, including an aborted conflict, the
    /// collection is left exactly as it was.
    pub fn import_with(
        &mut self,
        payload: &str,
        mode: ImportMode,
        on_conflict: OnConflict,
    ) -> Result<Committed<ImportReport>, EngineError> {
        let now = self.clock.tick();
        let Reconciled { entities, report } = reconcile::reconcile(
            &self.entities,
            payload,
            mode,
            &self.schema,
            self.config.import_policy,
            now,
        )?;

        let conflict = report.conflicts.first().cloned();
        if let (Some(warning), OnConflict::Abort) = (&conflict, on_conflict) {
            return Err(EngineError::Conflict(warning.clone()));
        }

        self.entities = entities;
        let persistence = self.persist();
        Ok(Committed::new(report, conflict, persistence))
    }

    pub fn import_file(
        &mut self,
        path: impl AsRef<Path>,
        mode: ImportMode,
    ) -> Result<Committed<ImportReport>, EngineError> {
        let payload = read_payload(path)?;
        self.import(&payload, mode)
    }

    fn persist(&mut self) -> Option<PersistenceWarning> {
        let key = self.config.storage_key.clone();
        let outcome = serde_json::to_string(&self.entities)
            .map_err(|e| e.to_string())
            .and_then(|document| {
                let bytes = document.len();
                self.adapter
                    .write(&key, &document)
                    .map(|()| bytes)
                    .map_err(|e| e.to_string())
            });
        match outcome {
            Ok(bytes) => {
                debug!("event=persist module=store key={} bytes={}", key, bytes);
                None
            }
            Err(message) => {
                warn!("event=persist_failed module=store key={} error={}", key, message);
                Some(PersistenceWarning { key, message })
            }
        }
    }
}

/// Reads an import file in one step.
pub fn read_payload(path: impl AsRef<Path>) -> Result<String, EngineError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => {
            EngineError::Parse(format!("`{}` is not UTF-8 text", path.display()))
        }
        _ => EngineError::Io(e),
    })
}

fn load_document(document: &str, schema: &EntitySchema, clock: &mut Clock) -> Result<Vec<Entity>, EngineError> {
    let records = reconcile::parse_payload(document)?;
    let now = clock.tick();
    let mut entities: Vec<Entity> = Vec::with_capacity(records.len());
    for (index, value) in records.into_iter().enumerate() {
        match reconcile::read_record(value, schema, now) {
            Ok(entity) if entities.iter().any(|e| e.id == entity.id) => {
                warn!(
                    "event=load_skip module=store collection={} index={} reason=duplicate id {}",
                    schema.name, index, entity.id
                );
            }
            Ok(entity) => entities.push(entity),
            Err(reason) => {
                warn!(
                    "event=load_skip module=store collection={} index={} reason={}",
                    schema.name, index, reason
                );
            }
        }
    }
    Ok(entities)
}
