//! Virtual clock for deterministic execution
//!
//! TigerStyle: Explicit time control, no system time dependencies.
//!
//! The clock's only source of advance is the controller. It holds a single
//! microsecond timestamp; nanoseconds are truncated on the way in.

use chrono::{DateTime, Duration, Utc};
use selkie_core::TimeProvider;
use std::sync::atomic::{AtomicI64, Ordering};

/// Instant a fresh clock starts at
pub const CLOCK_EPOCH_DEFAULT: &str = "2026-01-01T00:00:00Z";

/// Convert a signed duration to microseconds, saturating on overflow
pub(crate) fn duration_us(duration: Duration) -> i64 {
    duration.num_microseconds().unwrap_or(if duration > Duration::zero() {
        i64::MAX
    } else {
        i64::MIN
    })
}

/// Deterministic virtual clock
///
/// Time only moves when explicitly told to, so repeated reads between
/// mutations always yield equal values.
#[derive(Debug)]
pub struct VirtualClock {
    /// Current time in microseconds since the Unix epoch
    now_us: AtomicI64,
}

impl VirtualClock {
    /// Create a clock starting at the given instant (truncated to µs)
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now_us: AtomicI64::new(start.timestamp_micros()),
        }
    }

    /// Create a clock starting at a specific microsecond timestamp
    pub fn from_micros(us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(us),
        }
    }

    /// Get the current virtual instant
    pub fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.now_us())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Get the current virtual time in microseconds since epoch
    pub fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }

    /// Advance time by the given duration
    ///
    /// Negative durations are a programmer error; the clock is monotone
    /// under `advance`.
    pub fn advance(&self, duration: Duration) {
        assert!(
            duration >= Duration::zero(),
            "clock can only advance forward"
        );
        self.now_us.fetch_add(duration_us(duration), Ordering::SeqCst);
    }

    /// Set the current time unconditionally (fixture setup; may go backward)
    pub fn set(&self, time: DateTime<Utc>) {
        self.now_us.store(time.timestamp_micros(), Ordering::SeqCst);
    }

    /// Check if a deadline has passed
    pub fn is_past(&self, deadline: DateTime<Utc>) -> bool {
        self.now_us() >= deadline.timestamp_micros()
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(
            DateTime::parse_from_rfc3339(CLOCK_EPOCH_DEFAULT)
                .unwrap()
                .to_utc(),
        )
    }
}

impl TimeProvider for VirtualClock {
    fn now_us(&self) -> i64 {
        VirtualClock::now_us(self)
    }
}
