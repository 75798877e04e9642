//! Import reconciliation: merge or replace a collection with an externally
//! supplied snapshot.
//!
//! `reconcile` is pure. It never touches the current collection; the store
//! swaps in the returned collection only when the whole call succeeds.

use std::collections::HashMap;

use log::{info, warn};
use recordbox_core::{Entity, EntityId, EntitySchema, Timestamp};
use serde::{Deserialize, Serialize};

use crate::conflict::{ConflictWarning, detect};
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportMode {
    /// Discard the current collection and take the imported one.
    Replace,
    /// Upsert by id; records absent from the payload are left alone.
    Merge,
    /// Insert only ids not already present; never overwrite.
    AppendNew,
}

/// What to do with individual records that fail shape or field validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportPolicy {
    #[default]
    DropInvalid,
    RejectBatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedRecord {
    pub index: usize,
    pub id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub mode: ImportMode,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    /// Records superseded by a later record with the same id in the payload.
    pub duplicates: usize,
    pub dropped: Vec<DroppedRecord>,
    pub conflicts: Vec<ConflictWarning>,
    /// blake3 hex digest of the raw payload.
    pub digest: String,
}

impl ImportReport {
    fn new(mode: ImportMode, digest: String) -> Self {
        Self {
            mode,
            inserted: 0,
            updated: 0,
            unchanged: 0,
            skipped: 0,
            duplicates: 0,
            dropped: Vec::new(),
            conflicts: Vec::new(),
            digest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub entities: Vec<Entity>,
    pub report: ImportReport,
}

/// Decodes a payload into its records. Anything other than an array of
/// objects is a parse error.
pub fn parse_payload(payload: &str) -> Result<Vec<serde_json::Value>, EngineError> {
    let doc: serde_json::Value = serde_json::from_str(payload)
        .map_err(|e| EngineError::Parse(format!("payload is not valid JSON: {e}")))?;
    let serde_json::Value::Array(records) = doc else {
        return Err(EngineError::Parse("payload must be an array of records".into()));
    };
    if let Some(index) = records.iter().position(|r| !r.is_object()) {
        return Err(EngineError::Parse(format!("record {index} is not an object")));
    }
    Ok(records)
}

/// Shape check plus field normalization and validation for one record.
pub fn read_record(
    value: serde_json::Value,
    schema: &EntitySchema,
    now: Timestamp,
) -> Result<Entity, String> {
    let mut entity = Entity::from_json(value, now).map_err(|e| e.to_string())?;
    entity.fields = schema.prepare(entity.fields).map_err(|e| e.to_string())?;
    Ok(entity)
}

fn raw_id(value: &serde_json::Value) -> Option<String> {
    match value.get("id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub fn reconcile(
    current: &[Entity],
    payload: &str,
    mode: ImportMode,
    schema: &EntitySchema,
    policy: ImportPolicy,
    now: Timestamp,
) -> Result<Reconciled, EngineError> {
    let digest = blake3::hash(payload.as_bytes()).to_hex().to_string();
    let records = parse_payload(payload)?;
    let mut report = ImportReport::new(mode, digest);

    // one record per id: first position, last value
    let mut imported: Vec<Entity> = Vec::with_capacity(records.len());
    let mut seen: HashMap<EntityId, usize> = HashMap::new();
    for (index, value) in records.into_iter().enumerate() {
        let id = raw_id(&value);
        match read_record(value, schema, now) {
            Ok(entity) => match seen.get(&entity.id).copied() {
                Some(slot) => {
                    imported[slot] = entity;
                    report.duplicates += 1;
                }
                None => {
                    seen.insert(entity.id.clone(), imported.len());
                    imported.push(entity);
                }
            },
            Err(reason) => match policy {
                ImportPolicy::RejectBatch => {
                    return Err(EngineError::ImportRejected { index, reason });
                }
                ImportPolicy::DropInvalid => {
                    warn!(
                        "event=import_drop module=reconcile collection={} index={} reason={}",
                        schema.name, index, reason
                    );
                    report.dropped.push(DroppedRecord { index, id, reason });
                }
            },
        }
    }

    let mut entities: Vec<Entity> = match mode {
        ImportMode::Replace => Vec::with_capacity(imported.len()),
        ImportMode::Merge | ImportMode::AppendNew => current.to_vec(),
    };
    let mut positions: HashMap<EntityId, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();
    let mut touched: Vec<usize> = Vec::new();

    for incoming in imported {
        match positions.get(&incoming.id).copied() {
            Some(_) if mode == ImportMode::AppendNew => report.skipped += 1,
            Some(idx) => {
                let existing = &mut entities[idx];
                if existing.fields == incoming.fields {
                    report.unchanged += 1;
                } else {
                    // createdAt is immutable; updatedAt only moves forward
                    existing.fields = incoming.fields;
                    existing.updated_at = existing.updated_at.max(incoming.updated_at);
                    report.updated += 1;
                    touched.push(idx);
                }
            }
            None => {
                positions.insert(incoming.id.clone(), entities.len());
                touched.push(entities.len());
                entities.push(incoming);
                report.inserted += 1;
            }
        }
    }

    if let Some(rule) = &schema.conflict {
        touched.sort_unstable();
        touched.dedup();
        report.conflicts = touched
            .iter()
            .filter_map(|&idx| {
                let subject = &entities[idx];
                detect(rule, &entities, &subject.fields, Some(&subject.id))
            })
            .collect();
    }

    info!(
        "event=reconcile module=reconcile collection={} mode={:?} inserted={} updated={} unchanged={} skipped={} duplicates={} dropped={} conflicts={} digest={}",
        schema.name,
        mode,
        report.inserted,
        report.updated,
        report.unchanged,
        report.skipped,
        report.duplicates,
        report.dropped.len(),
        report.conflicts.len(),
        &report.digest[..16]
    );

    Ok(Reconciled { entities, report })
}
