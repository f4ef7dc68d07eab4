//! Wall-clock timestamps and injectable clocks

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::constants::timing::NANOSECONDS_PER_SECOND;

/// Wall-clock instant in nanoseconds since the UNIX epoch
pub type Timestamp = u64;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> Timestamp;
}

/// System time provider using actual system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_nanos(&self) -> Timestamp {
        current_timestamp_nanos()
    }
}

/// Mock time provider for deterministic testing
#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: Timestamp) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Advance by a (non-negative) number of seconds
    pub fn advance_secs(&self, seconds: f64) {
        self.advance_by(seconds_to_nanos(seconds));
    }

    pub fn set_time(&self, nanos: Timestamp) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> Timestamp {
        self.current_time.load(Ordering::Relaxed)
    }
}

pub fn current_timestamp_nanos() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Signed number of seconds from `from` to `to`.
///
/// Negative when `to` precedes `from`, which happens for events recorded
/// before a later `reset_origin`.
pub fn elapsed_seconds(from: Timestamp, to: Timestamp) -> f64 {
    if to >= from {
        (to - from) as f64 / NANOSECONDS_PER_SECOND as f64
    } else {
        -((from - to) as f64 / NANOSECONDS_PER_SECOND as f64)
    }
}

/// Convert seconds to whole nanoseconds, saturating at zero
pub fn seconds_to_nanos(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * NANOSECONDS_PER_SECOND as f64).round() as u64
    } else {
        0
    }
}
