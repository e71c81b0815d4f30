//! UTC timestamps with microsecond precision.
//!
//! Stored as a signed count of microseconds since the Unix epoch and
//! serialized as a bare JSON integer, which keeps the signed claim payload
//! free of date formatting choices.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Error;

/// Microseconds in one day.
pub const MICROS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000;

/// A point in time, in microseconds since the Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_micros())
    }

    /// Creates a timestamp from microseconds since the epoch.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Creates a timestamp from a chrono UTC datetime.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros())
    }

    /// Returns microseconds since the epoch.
    #[must_use]
    pub const fn as_micros(&self) -> i64 {
        self.0
    }

    /// Converts to a chrono datetime.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, Error> {
        DateTime::from_timestamp_micros(self.0)
            .ok_or_else(|| Error::InvalidTimestamp(format!("{} is out of range", self.0)))
    }

    /// Returns the UTC calendar date this timestamp falls on.
    pub fn utc_date(&self) -> Result<NaiveDate, Error> {
        Ok(self.to_datetime()?.date_naive())
    }

    /// Returns this timestamp shifted forward by whole days, or `None` on overflow.
    #[must_use]
    pub fn checked_add_days(&self, days: u32) -> Option<Self> {
        i64::from(days)
            .checked_mul(MICROS_PER_DAY)
            .and_then(|delta| self.0.checked_add(delta))
            .map(Self)
    }

    /// Returns this timestamp shifted by `delta` microseconds, saturating at the bounds.
    #[must_use]
    pub const fn saturating_add_micros(&self, delta: i64) -> Self {
        Self(self.0.saturating_add(delta))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Ok(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true)),
            Err(_) => write!(f, "@{}us", self.0),
        }
    }
}
