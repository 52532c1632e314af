//! Runtime interface
//!
//! TigerStyle: Explicit runtime abstraction with clear contracts.
//!
//! The actor layer talks to a runtime only through this trait; the
//! deterministic step runtime in `selkie-step` implements it, and a
//! production (thread-pooled, real-time) runtime would implement the same
//! surface. The trait is dyn-safe: spawned actor loops arrive as boxed
//! futures, and timer callbacks as boxed closures.

use crate::cancel::Cancellable;
use crate::error::Result;
use crate::mailbox::{Mailbox, MailboxConfig};
use crate::slot::FutureSlot;
use async_trait::async_trait;
use chrono::Duration;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A spawned actor loop, ready for the runtime to drive
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Callback for a one-shot timer
pub type OnceCallback = Box<dyn FnOnce() + Send + 'static>;

/// Callback for a repeating timer
pub type RepeatCallback = Box<dyn FnMut() + Send + 'static>;

/// Identifier of a spawned execution context
///
/// Monotone per runtime; the step runtime renders it as `step-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Runtime interface consumed by the actor system
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Short name identifying the runtime flavor (e.g. `"step"`)
    fn name(&self) -> &'static str;

    /// Construct and register a mailbox
    ///
    /// Mailboxes are registered in creation order; on the step runtime that
    /// order is the delivery tie-break.
    fn create_mailbox(&self, config: MailboxConfig) -> Result<Arc<dyn Mailbox>>;

    /// Create a future slot that fails with `AskTimeout` after `timeout`
    fn create_future_slot(&self, timeout: Duration) -> Arc<dyn FutureSlot>;

    /// Register an actor loop as a new execution context
    fn spawn(&self, actor_loop: TaskFuture) -> TaskId;

    /// Schedule a one-shot timer
    ///
    /// `delay` must be non-negative. Returns the cancellation handle; a
    /// timer cancelled before it matures never fires.
    fn schedule_once(&self, delay: Duration, callback: OnceCallback) -> Cancellable;

    /// Schedule a repeating timer
    ///
    /// `initial_delay` must be non-negative and `interval` positive. The
    /// cadence is anchored to the schedule, not the firing time: after a
    /// firing, the next due instant is the previous one plus `interval`.
    fn schedule_repeatedly(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: RepeatCallback,
    ) -> Cancellable;

    /// Yield control to the scheduler
    ///
    /// A no-op on the step runtime: there is no cooperative contention.
    async fn yield_now(&self);

    /// Sleep for a duration
    ///
    /// Deliberately inert on the step runtime: time only advances via
    /// `advance_time`, so a test that sleeps here would hang. A warning is
    /// logged instead.
    async fn sleep(&self, duration: Duration);

    /// Run until quiescent
    fn run(&self);

    /// Shut the runtime down
    ///
    /// Closes every mailbox (waking parked receivers, which observe
    /// `MailboxClosed` and terminate) and removes terminated contexts.
    /// `timeout` is accepted for interface compatibility; the step runtime
    /// ignores it.
    fn shutdown(&self, timeout: Duration);

    /// Whether `run` is currently executing
    fn is_running(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_ordering() {
        assert!(TaskId(0) < TaskId(1));
        assert_eq!(TaskId(7).to_string(), "7");
    }
}
