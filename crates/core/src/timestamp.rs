use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::CoreError;

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// UTC instant with millisecond precision, written as
/// `YYYY-MM-DDTHH:MM:SS.sssZ`.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(3))
    }

    /// Epoch milliseconds. Only instants in years 0000-9999 are accepted,
    /// since only those have an RFC 3339 form.
    pub fn from_millis(ms: i64) -> Result<Self, CoreError> {
        let dt = DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("{ms}ms is out of range")))?;
        Self::checked(dt).map_err(|_| CoreError::InvalidTimestamp(format!("{ms}ms is outside years 0000-9999")))
    }

    /// Parses any RFC 3339 string. Sub-millisecond digits are dropped so the
    /// value serializes back to the same text an export would produce.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|e| CoreError::InvalidTimestamp(format!("`{raw}`: {e}")))?;
        Self::checked(dt.with_timezone(&Utc))
    }

    fn checked(dt: DateTime<Utc>) -> Result<Self, CoreError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&dt.year()) {
            return Err(CoreError::InvalidTimestamp(format!(
                "{dt} is outside years {MIN_YEAR:04}-{MAX_YEAR}"
            )));
        }
        Ok(Self::from_datetime(dt))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn to_iso(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.to_iso())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

enum TimeSource {
    System,
    Manual(Timestamp),
}

/// A clock whose ticks never go backwards, even when the wall clock does.
pub struct Clock {
    source: TimeSource,
    floor: Option<Timestamp>,
}

impl Clock {
    pub fn system() -> Self {
        Self {
            source: TimeSource::System,
            floor: None,
        }
    }

    /// A clock that only moves when told to. Used by tests and replays.
    pub fn manual(start: Timestamp) -> Self {
        Self {
            source: TimeSource::Manual(start),
            floor: None,
        }
    }

    /// Next timestamp: the current source time, or the last issued value
    /// if the source has fallen behind it.
    pub fn tick(&mut self) -> Timestamp {
        let now = match &self.source {
            TimeSource::System => Timestamp::from_datetime(Utc::now()),
            TimeSource::Manual(at) => *at,
        };
        let ts = match self.floor {
            Some(floor) if floor > now => floor,
            _ => now,
        };
        self.floor = Some(ts);
        ts
    }

    /// Switch to manual time at `at`.
    pub fn set(&mut self, at: Timestamp) {
        self.source = TimeSource::Manual(at);
    }

    /// Move manual time forward (or backward, for skew tests). No effect on a
    /// system clock.
    pub fn advance(&mut self, by: Duration) {
        if let TimeSource::Manual(at) = &mut self.source {
            *at = Timestamp::from_datetime(at.0 + by);
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}
