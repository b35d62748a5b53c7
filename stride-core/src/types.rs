//! Domain types shared by the sync engine, the remote client and reports.
//!
//! Timestamps are `DateTime<Utc>` everywhere; wall-clock ("local") times only
//! appear in derived reports.

use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a remote activity.
///
/// The remote API hands out integers, but the archive keys on the textual
/// form, so both JSON numbers and strings are accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "RawActivityId")]
pub struct ActivityId(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawActivityId {
    Int(u64),
    Str(String),
}

impl From<RawActivityId> for ActivityId {
    fn from(raw: RawActivityId) -> Self {
        match raw {
            RawActivityId::Int(n) => Self(n.to_string()),
            RawActivityId::Str(s) => Self(s),
        }
    }
}

impl ActivityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for ActivityId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<String> for ActivityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ActivityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which side of the archive a sync run extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Newer than the newest archived activity.
    #[default]
    Forward,
    /// Older than the oldest archived activity.
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "forward"),
            Direction::Backward => write!(f, "backward"),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One row of the remote activity listing.
///
/// Only the fields the sync engine needs; everything else in the listing
/// payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub id: ActivityId,
    pub start_date: DateTime<Utc>,
}

impl ActivitySummary {
    pub fn new(id: impl Into<ActivityId>, start_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            start_date,
        }
    }
}

// ---------------------------------------------------------------------------
// Timestamp parsing
// ---------------------------------------------------------------------------

/// Parse the ISO-ish datetime strings found in archived payloads.
///
/// Accepts `T` or a single space between date and time, a `Z` suffix, an
/// explicit offset, or no offset at all. Offset-less values are read as UTC.
pub fn parse_isoish(value: &str) -> Option<DateTime<FixedOffset>> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    let normalized = if !s.contains('T') && s.contains(' ') {
        s.replacen(' ', "T", 1)
    } else {
        s.to_owned()
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%:z", "%Y-%m-%dT%H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(FixedOffset::east_opt(0)?.from_utc_datetime(&naive));
        }
    }
    None
}

/// [`parse_isoish`] normalized to UTC.
pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
    parse_isoish(value).map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
