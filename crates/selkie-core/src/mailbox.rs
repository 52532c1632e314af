//! Mailbox interface and configuration
//!
//! TigerStyle: Bounded queues with explicit limits, no silent drops.
//!
//! Overflow is policy, not accident: a bounded mailbox dispatches on its
//! [`OverflowStrategy`], and the sender always learns the outcome through
//! [`EnqueueResult`] or an error.

use crate::constants::MAILBOX_CAPACITY_COUNT_MAX;
use crate::envelope::Envelope;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// What a bounded mailbox does when it is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowStrategy {
    /// Reject the incoming envelope; the queue is unchanged
    DropNewest,
    /// Evict the head to make room for the incoming envelope
    DropOldest,
    /// Reject the incoming envelope and ask the sender to retry later
    Backpressure,
    /// Fail the enqueue with `MailboxOverflow`
    Throw,
}

impl std::fmt::Display for OverflowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DropNewest => "drop-newest",
            Self::DropOldest => "drop-oldest",
            Self::Backpressure => "backpressure",
            Self::Throw => "throw",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a non-failing enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueResult {
    /// The envelope is in the queue
    Accepted,
    /// The envelope was rejected under `DropNewest`
    Dropped,
    /// The envelope was rejected under `Backpressure`; the sender may retry
    Backpressured,
}

impl EnqueueResult {
    /// Whether the envelope made it into the queue
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxConfig {
    /// Owner path, e.g. `user/counter` (used in errors and logs)
    pub path: String,
    /// Capacity for a bounded mailbox; `None` means unbounded
    #[serde(default)]
    pub capacity: Option<usize>,
    /// Overflow strategy for a bounded mailbox
    #[serde(default = "default_overflow")]
    pub overflow: OverflowStrategy,
}

fn default_overflow() -> OverflowStrategy {
    OverflowStrategy::Throw
}

impl MailboxConfig {
    /// Create an unbounded mailbox configuration
    pub fn unbounded(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            capacity: None,
            overflow: default_overflow(),
        }
    }

    /// Create a bounded mailbox configuration
    pub fn bounded(path: impl Into<String>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity: Some(capacity),
            overflow: default_overflow(),
        }
    }

    /// Set the overflow strategy
    pub fn with_overflow(mut self, overflow: OverflowStrategy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Whether this configuration describes a bounded mailbox
    pub fn is_bounded(&self) -> bool {
        self.capacity.is_some()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(Error::InvalidConfiguration {
                field: "mailbox.path".into(),
                reason: "must not be empty".into(),
            });
        }

        if let Some(capacity) = self.capacity {
            if capacity == 0 {
                return Err(Error::InvalidConfiguration {
                    field: "mailbox.capacity".into(),
                    reason: "bounded capacity must be positive".into(),
                });
            }
            if capacity > MAILBOX_CAPACITY_COUNT_MAX {
                return Err(Error::InvalidConfiguration {
                    field: "mailbox.capacity".into(),
                    reason: format!(
                        "capacity {} exceeds limit {}",
                        capacity, MAILBOX_CAPACITY_COUNT_MAX
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Mailbox interface consumed by actor contexts and senders
///
/// Implementations decide how a blocked receiver is parked and resumed; the
/// step runtime parks it as a suspended execution context and resumes it
/// from `step()`.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Owner path of this mailbox
    fn path(&self) -> &str;

    /// Enqueue an envelope
    ///
    /// Fails with `MailboxClosed` on a closed mailbox. When bounded and at
    /// capacity, dispatches on the configured [`OverflowStrategy`].
    fn enqueue(&self, envelope: Envelope) -> Result<EnqueueResult>;

    /// Dequeue the head envelope without blocking
    fn dequeue(&self) -> Option<Envelope>;

    /// Dequeue the head envelope, blocking until one is available
    ///
    /// On the step runtime this always suspends the calling context first,
    /// even when the queue is non-empty, and the `timeout` is accepted for
    /// interface compatibility and ignored: virtual time only advances via
    /// `advance_time`, so honouring it here would break determinism.
    ///
    /// Fails with `MailboxClosed` once the mailbox is closed and drained.
    async fn dequeue_blocking(&self, timeout: Duration) -> Result<Envelope>;

    /// Number of queued envelopes
    fn len(&self) -> usize;

    /// Whether the queue is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a bounded mailbox is at capacity (unbounded is never full)
    fn is_full(&self) -> bool;

    /// Close the mailbox
    ///
    /// Further enqueues fail with `MailboxClosed`. A parked receiver is
    /// resumed exactly once so it can observe the close.
    fn close(&self);

    /// Whether the mailbox has been closed
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validate_rejects_empty_path() {
        let config = MailboxConfig::unbounded("");
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_config_validate_rejects_zero_capacity() {
        let config = MailboxConfig::bounded("user/a", 0);
        assert!(config.validate().is_err());

        let config = MailboxConfig::bounded("user/a", MAILBOX_CAPACITY_COUNT_MAX + 1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = MailboxConfig::bounded("user/a", 16).with_overflow(OverflowStrategy::DropOldest);
        assert!(config.is_bounded());
        assert_eq!(config.capacity, Some(16));
        assert_eq!(config.overflow, OverflowStrategy::DropOldest);
        assert!(config.validate().is_ok());

        let config = MailboxConfig::unbounded("user/b");
        assert!(!config.is_bounded());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overflow_strategy_display() {
        assert_eq!(OverflowStrategy::DropNewest.to_string(), "drop-newest");
        assert_eq!(OverflowStrategy::Backpressure.to_string(), "backpressure");
    }

    #[test]
    fn test_enqueue_result_accepted() {
        assert!(EnqueueResult::Accepted.is_accepted());
        assert!(!EnqueueResult::Dropped.is_accepted());
        assert!(!EnqueueResult::Backpressured.is_accepted());
    }
}
