//! Error types for Selkie
//!
//! TigerStyle: Explicit error types with context, using thiserror.
//!
//! Every variant carries plain, cloneable data: a failure stored in a
//! future slot is replayed to whoever awaits it, so `Error` must be `Clone`.

use crate::mailbox::OverflowStrategy;
use thiserror::Error;

/// Result type alias for Selkie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Selkie error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // =========================================================================
    // Mailbox Errors
    // =========================================================================
    #[error("Mailbox closed: {path}")]
    MailboxClosed { path: String },

    #[error("Mailbox overflow: {path}, capacity: {capacity}, strategy: {strategy}")]
    MailboxOverflow {
        path: String,
        capacity: usize,
        strategy: OverflowStrategy,
    },

    // =========================================================================
    // Ask / Future-Slot Errors
    // =========================================================================
    #[error("Ask timed out: {path} after {timeout_ms} ms")]
    AskTimeout { path: String, timeout_ms: u64 },

    #[error("Future cancelled: {path}")]
    FutureCancelled { path: String },

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid configuration: {field}, reason: {reason}")]
    InvalidConfiguration { field: String, reason: String },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a mailbox closed error
    pub fn mailbox_closed(path: impl Into<String>) -> Self {
        Self::MailboxClosed { path: path.into() }
    }

    /// Create a mailbox overflow error
    pub fn mailbox_overflow(
        path: impl Into<String>,
        capacity: usize,
        strategy: OverflowStrategy,
    ) -> Self {
        Self::MailboxOverflow {
            path: path.into(),
            capacity,
            strategy,
        }
    }

    /// Create an ask timeout error
    pub fn ask_timeout(path: impl Into<String>, timeout_ms: u64) -> Self {
        Self::AskTimeout {
            path: path.into(),
            timeout_ms,
        }
    }

    /// Create a future cancelled error
    pub fn future_cancelled(path: impl Into<String>) -> Self {
        Self::FutureCancelled { path: path.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error terminates an actor's receive loop
    ///
    /// A closed mailbox is the normal end of a run loop; everything else is
    /// surfaced to the caller that triggered it.
    pub fn is_mailbox_closed(&self) -> bool {
        matches!(self, Self::MailboxClosed { .. })
    }
}
