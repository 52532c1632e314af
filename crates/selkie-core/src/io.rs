//! Time abstraction for deterministic testing
//!
//! TigerStyle: All reads of the current time go through a trait.
//!
//! Code that needs the current time MUST use [`TimeProvider`]; never call
//! `SystemTime::now()` or `chrono::Utc::now()` directly. The production
//! implementation is [`WallClockTime`]; the step runtime's `VirtualClock`
//! implements the same trait so envelope timestamps come from virtual time.
//!
//! Sleeping is deliberately absent from this trait: waiting is a scheduler
//! concern and lives on the `Runtime` interface.

use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider abstraction
///
/// Instants are microseconds since the Unix epoch, signed so pre-epoch
/// fixture times stay representable.
pub trait TimeProvider: Send + Sync + std::fmt::Debug {
    /// Get current time in microseconds since epoch
    fn now_us(&self) -> i64;

    /// Get a monotonic timestamp in microseconds (for measuring durations)
    fn monotonic_us(&self) -> i64 {
        self.now_us()
    }
}

/// Production time provider using the wall clock
#[derive(Debug, Clone, Default)]
pub struct WallClockTime;

impl WallClockTime {
    /// Create a new wall clock time provider
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for WallClockTime {
    fn now_us(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_time_now_us() {
        let clock = WallClockTime::new();
        let now = clock.now_us();

        // Should be a reasonable timestamp (after 2020)
        assert!(now > 1_577_836_800_000_000); // Jan 1, 2020

        let now2 = clock.now_us();
        assert!(now2 >= now);
    }

    #[test]
    fn test_monotonic_defaults_to_now() {
        let clock = WallClockTime::new();
        let a = clock.monotonic_us();
        let b = clock.monotonic_us();
        assert!(b >= a);
    }
}
