//! UTC timestamps at the precision the store persists.
//!
//! Every timestamp written to disk is whole-second UTC rendered as
//! `YYYY-MM-DDTHH:MM:SSZ`. Values constructed in memory (the clock, file
//! modification times) are truncated on construction so that comparing an
//! in-memory value with one read back from disk never differs by a fraction
//! of a second.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::SystemTime;

const PERSISTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const COMPACT_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(0))
    }

    /// Convert a filesystem modification time.
    pub fn from_system_time(t: SystemTime) -> Self {
        Self::from_datetime(DateTime::<Utc>::from(t))
    }

    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self)
    }

    /// Parse a persisted timestamp.
    ///
    /// Accepts RFC 3339 with any offset (normalized to UTC) and a bare
    /// `YYYY-MM-DDTHH:MM:SS` taken as UTC. Returns `None` for empty or
    /// malformed input.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self::from_datetime(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| Self::from_datetime(naive.and_utc()))
    }

    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    #[must_use]
    pub fn plus_seconds(&self, secs: i64) -> Self {
        Self(self.0 + chrono::Duration::seconds(secs))
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Separator-free rendering used in artifact file names
    /// (`20250101T120000Z`).
    pub fn compact(&self) -> String {
        self.0.format(COMPACT_FORMAT).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(PERSISTED_FORMAT))
    }
}

impl From<Timestamp> for SystemTime {
    fn from(ts: Timestamp) -> Self {
        ts.0.into()
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }
}
