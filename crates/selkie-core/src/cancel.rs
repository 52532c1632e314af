//! Cancellation token
//!
//! TigerStyle: One-shot flag with explicit observation points.
//!
//! A [`Cancellable`] is shared between the scheduler (which polls it before
//! firing a timer) and the caller that holds the handle returned by
//! `schedule_once` / `schedule_repeatedly`. There is no wake-up protocol;
//! holders poll at well-defined observation points.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared one-shot cancellation flag
#[derive(Debug, Clone, Default)]
pub struct Cancellable {
    cancelled: Arc<AtomicBool>,
}

impl Cancellable {
    /// Create a new, un-cancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    ///
    /// Idempotent. Returns `true` only for the call that flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    /// Check whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_idempotent() {
        let token = Cancellable::new();
        assert!(!token.is_cancelled());

        assert!(token.cancel());
        assert!(token.is_cancelled());

        // Second cancel is a no-op
        assert!(!token.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let token = Cancellable::new();
        let held_by_scheduler = token.clone();

        token.cancel();
        assert!(held_by_scheduler.is_cancelled());
    }
}
