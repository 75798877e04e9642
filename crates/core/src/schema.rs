//! Per-domain field rules and the uniqueness rule used for conflict checks.
//!
//! A schema never rejects unknown fields; it only constrains the ones it
//! names. The primary field is always required and non-empty.

use crate::entity::{Fields, RESERVED_KEYS};
use crate::error::{FieldIssue, Problem, ValidationError};
use crate::field_value::{FieldValue, parse_date, parse_time};
use crate::timestamp::Timestamp;

pub const DEFAULT_PRIMARY_MAX_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Number,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// `HH:MM` or `HH:MM:SS`
    Time,
    DateTime,
    List,
    Choice(Vec<String>),
    Any,
}

impl FieldKind {
    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Date | FieldKind::Time | FieldKind::DateTime => "text",
            FieldKind::Choice(_) => "one of the listed options",
            FieldKind::Integer => "an integer",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "true or false",
            FieldKind::List => "a list of text",
            FieldKind::Any => "any value",
        }
    }

    fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::Text | FieldKind::Date | FieldKind::Time | FieldKind::DateTime | FieldKind::Choice(_)
        )
    }
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub key: String,
    pub kind: FieldKind,
    pub required: bool,
    pub max_len: Option<usize>,
}

impl FieldRule {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: false,
            max_len: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn max_len(mut self, max: usize) -> Self {
        self.max_len = Some(max);
        self
    }

    fn check(&self, value: Option<&FieldValue>) -> Option<Problem> {
        let value = match value {
            None | Some(FieldValue::Null) => {
                return self.required.then_some(Problem::Missing);
            }
            Some(v) => v,
        };

        match (&self.kind, value) {
            (kind, FieldValue::Text(s)) if kind.is_textual() => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return self.required.then_some(Problem::Empty);
                }
                if let Some(problem) = self.check_len(s) {
                    return Some(problem);
                }
                match kind {
                    FieldKind::Date if parse_date(trimmed).is_none() => {
                        Some(Problem::Malformed("expected YYYY-MM-DD".into()))
                    }
                    FieldKind::Time if parse_time(trimmed).is_none() => {
                        Some(Problem::Malformed("expected HH:MM".into()))
                    }
                    FieldKind::DateTime => Timestamp::parse(trimmed)
                        .err()
                        .map(|_| Problem::Malformed("expected an ISO-8601 timestamp".into())),
                    FieldKind::Choice(options) if !options.iter().any(|o| o == trimmed) => {
                        Some(Problem::NotAllowed { value: trimmed.to_string() })
                    }
                    _ => None,
                }
            }
            (FieldKind::Integer, FieldValue::Integer(_)) => None,
            (FieldKind::Number, FieldValue::Integer(_)) => None,
            (FieldKind::Number, FieldValue::Float(f)) if f.is_finite() => None,
            (FieldKind::Boolean, FieldValue::Boolean(_)) => None,
            (FieldKind::List, FieldValue::List(items)) => {
                if self.required && items.is_empty() {
                    return Some(Problem::Empty);
                }
                items.iter().find_map(|item| self.check_len(item))
            }
            (FieldKind::Any, _) => None,
            (kind, _) => Some(Problem::WrongType { expected: kind.expected() }),
        }
    }

    fn check_len(&self, s: &str) -> Option<Problem> {
        let max = self.max_len?;
        let actual = s.chars().count();
        (actual > max).then_some(Problem::TooLong { max, actual })
    }

    /// Coerces form-style input into the rule's kind: trims text, splits
    /// comma-separated tags, parses numeric text.
    fn normalize(&self, value: FieldValue) -> FieldValue {
        match (&self.kind, value) {
            (kind, FieldValue::Text(s)) if kind.is_textual() => FieldValue::Text(s.trim().to_string()),
            (FieldKind::List, FieldValue::Text(s)) => FieldValue::List(split_tags(s.split(','))),
            (FieldKind::List, FieldValue::List(items)) => {
                FieldValue::List(split_tags(items.iter().map(String::as_str)))
            }
            (FieldKind::Integer, FieldValue::Text(s)) => match s.trim().parse::<i64>() {
                Ok(n) => FieldValue::Integer(n),
                Err(_) => FieldValue::Text(s),
            },
            (FieldKind::Number, FieldValue::Text(s)) => {
                let trimmed = s.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    FieldValue::Integer(n)
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => FieldValue::Float(f),
                        _ => FieldValue::Text(s),
                    }
                }
            }
            (_, other) => other,
        }
    }
}

fn split_tags<'a>(parts: impl Iterator<Item = &'a str>) -> Vec<String> {
    parts
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Composite uniqueness key among active records, e.g. one non-cancelled
/// booking per `(date, time)`.
#[derive(Debug, Clone)]
pub struct ConflictRule {
    pub key_fields: Vec<String>,
    pub status_field: String,
    pub void_values: Vec<String>,
}

impl ConflictRule {
    pub fn new<I, S>(key_fields: I, status_field: impl Into<String>, void_values: &[&str]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
            status_field: status_field.into(),
            void_values: void_values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Void records (cancelled, archived, ...) never take part in a conflict.
    pub fn is_void(&self, fields: &Fields) -> bool {
        fields
            .get(&self.status_field)
            .and_then(FieldValue::as_text)
            .is_some_and(|status| {
                self.void_values
                    .iter()
                    .any(|v| v.eq_ignore_ascii_case(status.trim()))
            })
    }

    /// The composite key, or `None` when any part is absent or blank.
    pub fn key_of(&self, fields: &Fields) -> Option<Vec<FieldValue>> {
        self.key_fields
            .iter()
            .map(|k| match fields.get(k) {
                None | Some(FieldValue::Null) => None,
                Some(FieldValue::Text(s)) if s.trim().is_empty() => None,
                Some(v) => Some(v.clone()),
            })
            .collect()
    }
}

/// Validation and identity rules for one domain collection.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    pub name: String,
    pub storage_key: String,
    pub primary_field: String,
    pub rules: Vec<FieldRule>,
    pub conflict: Option<ConflictRule>,
}

impl EntitySchema {
    /// A schema whose primary field is required text of at most
    /// `DEFAULT_PRIMARY_MAX_LEN` characters. Use `field` to override it.
    pub fn new(
        name: impl Into<String>,
        storage_key: impl Into<String>,
        primary_field: impl Into<String>,
    ) -> Self {
        let primary_field = primary_field.into();
        Self {
            name: name.into(),
            storage_key: storage_key.into(),
            rules: vec![
                FieldRule::new(primary_field.clone(), FieldKind::Text)
                    .required()
                    .max_len(DEFAULT_PRIMARY_MAX_LEN),
            ],
            primary_field,
            conflict: None,
        }
    }

    /// Adds a rule, replacing any existing rule for the same key.
    pub fn field(mut self, rule: FieldRule) -> Self {
        let rule = if rule.key == self.primary_field {
            FieldRule { required: true, ..rule }
        } else {
            rule
        };
        match self.rules.iter_mut().find(|r| r.key == rule.key) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
        self
    }

    pub fn with_conflict(mut self, rule: ConflictRule) -> Self {
        self.conflict = Some(rule);
        self
    }

    pub fn rule(&self, key: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.key == key)
    }

    /// Strips reserved keys, drops null optional values and coerces values
    /// toward their rule's kind.
    pub fn normalize(&self, fields: &mut Fields) {
        for key in RESERVED_KEYS {
            fields.remove(key);
        }
        for rule in &self.rules {
            let Some(value) = fields.remove(&rule.key) else {
                continue;
            };
            if value.is_null() && !rule.required {
                continue;
            }
            fields.insert(rule.key.clone(), rule.normalize(value));
        }
    }

    pub fn validate(&self, fields: &Fields) -> Result<(), ValidationError> {
        let mut issues: Vec<FieldIssue> = RESERVED_KEYS
            .iter()
            .filter(|k| fields.contains_key(**k))
            .map(|k| FieldIssue {
                field: k.to_string(),
                problem: Problem::Reserved,
            })
            .collect();

        for rule in &self.rules {
            if let Some(problem) = rule.check(fields.get(&rule.key)) {
                issues.push(FieldIssue {
                    field: rule.key.clone(),
                    problem,
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// `normalize` followed by `validate`.
    pub fn prepare(&self, mut fields: Fields) -> Result<Fields, ValidationError> {
        self.normalize(&mut fields);
        self.validate(&fields)?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> EntitySchema {
        EntitySchema::new("tasks", "Test.tasks", "title")
            .field(FieldRule::new("title", FieldKind::Text).max_len(10))
            .field(FieldRule::new("due", FieldKind::Date))
            .field(FieldRule::new("tags", FieldKind::List))
            .field(FieldRule::new("estimate", FieldKind::Number))
            .field(FieldRule::new(
                "status",
                FieldKind::Choice(vec!["todo".into(), "done".into()]),
            ))
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn primary_field_stays_required_after_override() {
        let s = schema();
        let err = s.validate(&Fields::new()).unwrap_err();
        assert_eq!(err.issues.len(), 1);
        assert_eq!(err.issues[0].field, "title");
        assert_eq!(err.issues[0].problem, Problem::Missing);
        assert!(s.rule("title").unwrap().required);
    }

    #[test]
    fn collects_every_offending_field() {
        let s = schema();
        let err = s
            .validate(&fields(&[
                ("title", FieldValue::from("   ")),
                ("due", FieldValue::from("tomorrow")),
                ("status", FieldValue::from("blocked")),
                ("estimate", FieldValue::Boolean(true)),
            ]))
            .unwrap_err();
        let names: Vec<&str> = err.fields().collect();
        assert_eq!(names, vec!["title", "due", "estimate", "status"]);
        assert_eq!(err.issues[0].problem, Problem::Empty);
    }

    #[test]
    fn length_ceiling_counts_characters() {
        let s = schema();
        let err = s
            .validate(&fields(&[("title", FieldValue::from("ééééééééééé"))]))
            .unwrap_err();
        assert_eq!(err.issues[0].problem, Problem::TooLong { max: 10, actual: 11 });
        assert!(s.validate(&fields(&[("title", FieldValue::from("éééééééééé"))])).is_ok());
    }

    #[test]
    fn normalize_coerces_form_input() {
        let s = schema();
        let prepared = s
            .prepare(fields(&[
                ("id", FieldValue::from("smuggled")),
                ("title", FieldValue::from("  Buy milk ")),
                ("tags", FieldValue::from("home, ,errands ")),
                ("estimate", FieldValue::from("1.5")),
                ("due", FieldValue::Null),
                ("notes", FieldValue::from("kept as is ")),
            ]))
            .unwrap();
        assert!(!prepared.contains_key("id"));
        assert!(!prepared.contains_key("due"));
        assert_eq!(prepared["title"], FieldValue::from("Buy milk"));
        assert_eq!(prepared["tags"], FieldValue::List(vec!["home".into(), "errands".into()]));
        assert_eq!(prepared["estimate"], FieldValue::Float(1.5));
        assert_eq!(prepared["notes"], FieldValue::from("kept as is "));
    }

    #[test]
    fn reserved_keys_are_reported_when_not_normalized() {
        let s = schema();
        let err = s
            .validate(&fields(&[
                ("title", FieldValue::from("ok")),
                ("createdAt", FieldValue::from("2025-01-01T00:00:00Z")),
            ]))
            .unwrap_err();
        assert_eq!(err.issues[0].problem, Problem::Reserved);
    }

    #[test]
    fn conflict_key_requires_every_part() {
        let rule = ConflictRule::new(["date", "time"], "status", &["cancelled"]);
        let full = fields(&[
            ("date", FieldValue::from("2025-01-01")),
            ("time", FieldValue::from("10:00")),
            ("status", FieldValue::from("Cancelled")),
        ]);
        assert_eq!(rule.key_of(&full).unwrap().len(), 2);
        assert!(rule.is_void(&full));

        let partial = fields(&[("date", FieldValue::from("2025-01-01")), ("time", FieldValue::from(""))]);
        assert!(rule.key_of(&partial).is_none());
        assert!(!rule.is_void(&partial));
    }
}
