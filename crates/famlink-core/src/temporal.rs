//! # Temporal Types — UTC Timestamps and Clocks
//!
//! Defines [`Timestamp`], a UTC-only timestamp truncated to seconds
//! precision, and the [`Clock`] trait through which the engine reads the
//! current time.
//!
//! ## Day Arithmetic
//!
//! Cooldown rules are expressed in whole days. A day is exactly 24 hours
//! of elapsed time, independent of calendar boundaries:
//! [`Timestamp::whole_days_since`] floors the elapsed duration, and
//! [`Timestamp::plus_days`] adds `n * 24h`. For any `anchor` and `now`,
//! `now.whole_days_since(anchor) >= n` holds exactly when
//! `now >= anchor.plus_days(n)`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const SECS_PER_DAY: i64 = 86_400;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string, accepting any offset and converting to UTC.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| ValidationError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp(format!("epoch seconds {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This instant plus `days * 24h`. Saturates at the representable maximum.
    pub fn plus_days(&self, days: u32) -> Self {
        let shifted = self
            .0
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self(shifted)
    }

    /// Whole 24-hour periods elapsed since `earlier`, floored.
    ///
    /// Negative when `earlier` lies in the future.
    pub fn whole_days_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).num_seconds().div_euclid(SECS_PER_DAY)
    }

    /// Render as ISO 8601 with Z suffix (e.g. `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clocks ──────────────────────────────────────────────────────────

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock to `to`.
    pub fn set(&self, to: Timestamp) {
        *self.now.lock() = to;
    }

    /// Advance by whole days.
    pub fn advance_days(&self, days: u32) {
        let mut guard = self.now.lock();
        *guard = guard.plus_days(days);
    }

    /// Advance by seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut guard = self.now.lock();
        *guard = Timestamp::from_utc(guard.0 + Duration::seconds(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
