//! Message envelope
//!
//! TigerStyle: Explicit timestamps, bounded payloads.
//!
//! The envelope is opaque to the runtime: mailboxes queue it and contexts
//! dequeue it, but only the actor layer interprets `operation` and
//! `payload`. Replies, when an exchange has one, travel through a future
//! slot rather than a channel carried inside the envelope.

use crate::constants::{MESSAGE_SIZE_BYTES_MAX, OPERATION_LENGTH_BYTES_MAX};
use crate::io::{TimeProvider, WallClockTime};
use bytes::Bytes;

/// A message in a mailbox
#[derive(Debug)]
pub struct Envelope {
    /// The operation name
    pub operation: String,
    /// The message payload
    pub payload: Bytes,
    /// When the message was created (microseconds, from the stamping clock)
    pub enqueued_at_us: i64,
}

impl Envelope {
    /// Create a new envelope stamped with the production wall clock
    ///
    /// Inside a step-runtime test, use [`Envelope::new_with_time`] with the
    /// runtime's virtual clock so timestamps stay deterministic.
    pub fn new(operation: impl Into<String>, payload: Bytes) -> Self {
        Self::new_with_time(operation, payload, &WallClockTime::new())
    }

    /// Create a new envelope with an injected time provider
    pub fn new_with_time(
        operation: impl Into<String>,
        payload: Bytes,
        time: &dyn TimeProvider,
    ) -> Self {
        let operation = operation.into();

        debug_assert!(!operation.is_empty(), "operation must not be empty");
        debug_assert!(
            operation.len() <= OPERATION_LENGTH_BYTES_MAX,
            "operation exceeds OPERATION_LENGTH_BYTES_MAX"
        );
        debug_assert!(
            payload.len() <= MESSAGE_SIZE_BYTES_MAX,
            "payload exceeds MESSAGE_SIZE_BYTES_MAX"
        );

        Self {
            operation,
            payload,
            enqueued_at_us: time.monotonic_us(),
        }
    }

    /// Microseconds this message has been waiting, per the given clock
    pub fn wait_time_us(&self, time: &dyn TimeProvider) -> i64 {
        time.monotonic_us().saturating_sub(self.enqueued_at_us)
    }
}
