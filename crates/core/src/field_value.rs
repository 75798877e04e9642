use std::cmp::Ordering;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::timestamp::Timestamp;

/// One domain attribute value. Serialized as the bare JSON value so stored
/// documents look exactly like the records the apps export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    Json(serde_json::Value),
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b).is_eq(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Json(a), Self::Json(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FieldValue {}

impl FieldValue {
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) if items.iter().all(Value::is_string) => Self::List(
                items
                    .into_iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            other => Self::Json(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(n) => Some(*n as f64),
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Calendar date carried by a `YYYY-MM-DD` or full ISO-8601 text value.
    pub fn as_date(&self) -> Option<NaiveDate> {
        let text = self.as_text()?.trim();
        parse_date(text).or_else(|| Timestamp::parse(text).ok().map(|t| t.date()))
    }

    /// Case-insensitive substring match. `needle` must already be lowercase.
    pub fn matches_text(&self, needle: &str) -> bool {
        match self {
            FieldValue::Text(s) => s.to_lowercase().contains(needle),
            FieldValue::List(items) => items.iter().any(|s| s.to_lowercase().contains(needle)),
            FieldValue::Integer(n) => n.to_string().contains(needle),
            FieldValue::Float(f) => f.to_string().contains(needle),
            FieldValue::Json(v) => v.to_string().to_lowercase().contains(needle),
            FieldValue::Null | FieldValue::Boolean(_) => false,
        }
    }

    /// Tag membership: list element (or comma-separated text entry) equal to
    /// `item`, ignoring case.
    pub fn contains_item(&self, item: &str) -> bool {
        let item = item.trim();
        match self {
            FieldValue::List(items) => items.iter().any(|s| s.trim().eq_ignore_ascii_case(item)),
            FieldValue::Text(s) => s.split(',').any(|s| s.trim().eq_ignore_ascii_case(item)),
            _ => false,
        }
    }

    /// Ordering used by list views. Values rank by kind first (null,
    /// boolean, number, timestamp text, date text, time text, plain text,
    /// list, json) and compare within their rank, so the order is total
    /// for any mix of values.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.sort_key().compare(&other.sort_key())
    }

    fn sort_key(&self) -> SortKey<'_> {
        match self {
            FieldValue::Null => SortKey::Null,
            FieldValue::Boolean(b) => SortKey::Boolean(*b),
            FieldValue::Integer(n) => SortKey::Number(*n as f64),
            FieldValue::Float(f) => SortKey::Number(*f),
            FieldValue::Text(s) => text_key(s),
            FieldValue::List(items) => SortKey::List(items),
            FieldValue::Json(v) => SortKey::Json(v.to_string()),
        }
    }
}

/// Comparison key for `sort_cmp`. Variant order is the rank order.
enum SortKey<'a> {
    Null,
    Boolean(bool),
    Number(f64),
    Instant(Timestamp),
    Date(NaiveDate),
    Time(NaiveTime),
    Text(&'a str),
    List(&'a [String]),
    Json(String),
}

impl SortKey<'_> {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Null => 0,
            SortKey::Boolean(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Instant(_) => 3,
            SortKey::Date(_) => 4,
            SortKey::Time(_) => 5,
            SortKey::Text(_) => 6,
            SortKey::List(_) => 7,
            SortKey::Json(_) => 8,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Boolean(a), SortKey::Boolean(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::List(a), SortKey::List(b)) => a.cmp(b),
            (SortKey::Json(a), SortKey::Json(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

fn text_key(text: &str) -> SortKey<'_> {
    let trimmed = text.trim();
    if let Ok(ts) = Timestamp::parse(trimmed) {
        return SortKey::Instant(ts);
    }
    if let Some(d) = parse_date(trimmed) {
        return SortKey::Date(d);
    }
    if let Some(t) = parse_time(trimmed) {
        return SortKey::Time(t);
    }
    SortKey::Text(text)
}

pub(crate) fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

pub(crate) fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}
