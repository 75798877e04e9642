use std::fmt;

use recordbox_core::{ConflictRule, Entity, EntityId, FieldValue, Fields};

/// Non-blocking signal that a write would share its composite key with
/// other active records. The caller decides whether to proceed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictWarning {
    /// The record being written; `None` for a record not yet created.
    pub subject: Option<EntityId>,
    pub key: Vec<(String, FieldValue)>,
    pub blockers: Vec<EntityId>,
}

impl fmt::Display for ConflictWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("slot ")?;
        for (i, (field, value)) in self.key.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match value {
                FieldValue::Text(s) => write!(f, "{field}={s}")?,
                other => write!(f, "{field}={other:?}")?,
            }
        }
        f.write_str(" is already taken by ")?;
        for (i, id) in self.blockers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Scans active records other than `exclude` for one sharing the
/// candidate's composite key. Void records are ignored on both sides, and a
/// candidate with an incomplete key never conflicts.
pub fn detect(
    rule: &ConflictRule,
    collection: &[Entity],
    candidate: &Fields,
    exclude: Option<&EntityId>,
) -> Option<ConflictWarning> {
    if rule.is_void(candidate) {
        return None;
    }
    let key = rule.key_of(candidate)?;

    let blockers: Vec<EntityId> = collection
        .iter()
        .filter(|e| Some(&e.id) != exclude)
        .filter(|e| !rule.is_void(&e.fields))
        .filter(|e| rule.key_of(&e.fields).as_ref() == Some(&key))
        .map(|e| e.id.clone())
        .collect();

    if blockers.is_empty() {
        return None;
    }

    Some(ConflictWarning {
        subject: exclude.cloned(),
        key: rule.key_fields.iter().cloned().zip(key).collect(),
        blockers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recordbox_core::Timestamp;

    fn rule() -> ConflictRule {
        ConflictRule::new(["date", "time"], "status", &["cancelled"])
    }

    fn booking(id: &str, date: &str, time: &str, status: &str) -> Entity {
        let fields: Fields = [
            ("date", date),
            ("time", time),
            ("status", status),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), FieldValue::from(v)))
        .collect();
        Entity::new(
            EntityId::parse(id).unwrap(),
            fields,
            Timestamp::parse("2025-01-01T00:00:00Z").unwrap(),
        )
    }

    #[test]
    fn same_slot_conflicts() {
        let existing = vec![booking("a", "2025-01-01", "10:00", "confirmed")];
        let candidate = booking("b", "2025-01-01", "10:00", "confirmed");
        let warning = detect(&rule(), &existing, &candidate.fields, None).unwrap();
        assert_eq!(warning.blockers, vec![EntityId::parse("a").unwrap()]);
        assert_eq!(warning.subject, None);
        assert_eq!(warning.to_string(), "slot date=2025-01-01, time=10:00 is already taken by a");
    }

    #[test]
    fn cancelled_records_never_conflict() {
        let existing = vec![booking("a", "2025-01-01", "10:00", "cancelled")];
        let candidate = booking("b", "2025-01-01", "10:00", "confirmed");
        assert!(detect(&rule(), &existing, &candidate.fields, None).is_none());

        let existing = vec![booking("a", "2025-01-01", "10:00", "confirmed")];
        let candidate = booking("b", "2025-01-01", "10:00", "cancelled");
        assert!(detect(&rule(), &existing, &candidate.fields, None).is_none());
    }

    #[test]
    fn a_record_does_not_block_itself() {
        let existing = vec![booking("a", "2025-01-01", "10:00", "confirmed")];
        let id = EntityId::parse("a").unwrap();
        assert!(detect(&rule(), &existing, &existing[0].fields, Some(&id)).is_none());
    }

    #[test]
    fn different_time_is_free() {
        let existing = vec![booking("a", "2025-01-01", "10:00", "confirmed")];
        let candidate = booking("b", "2025-01-01", "10:30", "confirmed");
        assert!(detect(&rule(), &existing, &candidate.fields, None).is_none());
    }
}
