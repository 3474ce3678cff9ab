use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the local wall clock, injectable so skew checks can be tested.
pub trait TimeProvider: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct FixedTimeProvider {
    millis: AtomicI64,
}

impl FixedTimeProvider {
    pub fn new(millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.millis.fetch_add(minutes * 60_000, Ordering::SeqCst);
    }
}

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// RFC3339 rendering of epoch milliseconds; falls back to the raw number
/// when out of chrono's range.
pub fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{millis}ms"))
}

/// Absolute distance between two instants in whole minutes, rounded down.
pub fn skew_minutes(local_millis: i64, remote_millis: i64) -> i64 {
    (local_millis - remote_millis).abs() / 60_000
}
