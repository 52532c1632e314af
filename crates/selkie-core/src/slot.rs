//! Future slot interface
//!
//! Single-assignment cell bridging ask-pattern replies into an actor's
//! synchronous flow. A slot transitions from pending to exactly one
//! terminal state (resolved, failed, cancelled) and is immutable
//! thereafter; the first terminal call wins and later calls are no-ops.

use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;

/// Callback invoked when cancellation wins the race
pub type CancelCallback = Box<dyn FnOnce() + Send + 'static>;

/// Single-assignment reply cell
#[async_trait]
pub trait FutureSlot: Send + Sync {
    /// Identifier used in `AskTimeout` / `FutureCancelled` errors
    fn path(&self) -> &str;

    /// Resolve with a value; returns `true` only if this call won
    fn resolve(&self, value: Bytes) -> bool;

    /// Fail with an error; returns `true` only if this call won
    fn fail(&self, error: Error) -> bool;

    /// Cancel; returns `true` only if this call won
    ///
    /// When cancel wins, `on_cancel` callbacks run in registration order.
    fn cancel(&self) -> bool;

    /// Whether the slot has reached any terminal state
    fn is_resolved(&self) -> bool;

    /// Register a callback to run when, and only when, cancel wins
    ///
    /// Registered after cancel already won, the callback runs immediately.
    fn on_cancel(&self, callback: CancelCallback);

    /// Wait for the terminal state
    ///
    /// Suspends the calling context (reason: future wait) while the slot is
    /// pending; completes immediately on an already-terminal slot. Returns
    /// the resolved value, replays the stored failure, or fails with
    /// `FutureCancelled`.
    async fn wait(&self) -> Result<Bytes>;
}
