//! Future slot
//!
//! Single-assignment cell bridging ask-pattern replies into an actor's
//! synchronous flow. The first terminal call (resolve, fail, or cancel)
//! wins, takes the parked waiter, and resumes it; later calls are no-ops.
//! Because everything runs in the one controlling flow, "racey" is only
//! abstract: whichever call arrives first wins.

use crate::context::{current_task, record_suspension, SuspendReason};
use crate::runtime::StepShared;
use async_trait::async_trait;
use bytes::Bytes;
use selkie_core::{CancelCallback, Error, FutureSlot, Result, TaskId};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, Weak};
use std::task::{Context, Poll};
use tracing::debug;

enum SlotValue {
    Pending,
    Resolved(Bytes),
    Failed(Error),
    Cancelled,
}

struct SlotState {
    value: SlotValue,
    /// The (at most one in practice) context parked in `wait`
    waiter: Option<TaskId>,
    on_cancel: Vec<CancelCallback>,
}

/// Future slot owned by the step runtime
pub struct StepFutureSlot {
    path: String,
    shared: Weak<StepShared>,
    state: Mutex<SlotState>,
}

impl StepFutureSlot {
    pub(crate) fn new(path: String, shared: Weak<StepShared>) -> Self {
        Self {
            path,
            shared,
            state: Mutex::new(SlotState {
                value: SlotValue::Pending,
                waiter: None,
                on_cancel: Vec::new(),
            }),
        }
    }

    fn resume_waiter(&self, waiter: Option<TaskId>) {
        if let Some(task) = waiter {
            if let Some(shared) = self.shared.upgrade() {
                shared.resume(task);
            }
        }
    }
}

impl std::fmt::Debug for StepFutureSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        let value = match state.value {
            SlotValue::Pending => "pending",
            SlotValue::Resolved(_) => "resolved",
            SlotValue::Failed(_) => "failed",
            SlotValue::Cancelled => "cancelled",
        };
        f.debug_struct("StepFutureSlot")
            .field("path", &self.path)
            .field("state", &value)
            .field("waiter", &state.waiter)
            .finish()
    }
}

#[async_trait]
impl FutureSlot for StepFutureSlot {
    fn path(&self) -> &str {
        &self.path
    }

    fn resolve(&self, value: Bytes) -> bool {
        let waiter = {
            let mut state = self.state.lock().unwrap();
            if !matches!(state.value, SlotValue::Pending) {
                return false;
            }
            state.value = SlotValue::Resolved(value);
            // Cancel lost: its callbacks never run
            state.on_cancel.clear();
            state.waiter.take()
        };

        debug!(path = %self.path, "future slot resolved");
        self.resume_waiter(waiter);
        true
    }

    fn fail(&self, error: Error) -> bool {
        let waiter = {
            let mut state = self.state.lock().unwrap();
            if !matches!(state.value, SlotValue::Pending) {
                return false;
            }
            state.value = SlotValue::Failed(error);
            state.on_cancel.clear();
            state.waiter.take()
        };

        debug!(path = %self.path, "future slot failed");
        self.resume_waiter(waiter);
        true
    }

    fn cancel(&self) -> bool {
        let (callbacks, waiter) = {
            let mut state = self.state.lock().unwrap();
            if !matches!(state.value, SlotValue::Pending) {
                return false;
            }
            state.value = SlotValue::Cancelled;
            (std::mem::take(&mut state.on_cancel), state.waiter.take())
        };

        debug!(path = %self.path, callbacks = callbacks.len(), "future slot cancelled");
        for callback in callbacks {
            callback();
        }
        self.resume_waiter(waiter);
        true
    }

    fn is_resolved(&self) -> bool {
        !matches!(self.state.lock().unwrap().value, SlotValue::Pending)
    }

    fn on_cancel(&self, callback: CancelCallback) {
        let mut state = self.state.lock().unwrap();
        if matches!(state.value, SlotValue::Pending) {
            state.on_cancel.push(callback);
        } else if matches!(state.value, SlotValue::Cancelled) {
            // Cancel already won: run immediately rather than drop silently
            drop(state);
            callback();
        }
        // Resolved or failed: cancel lost, the callback never runs
    }

    async fn wait(&self) -> Result<Bytes> {
        WaitFuture { slot: self }.await
    }
}

/// The future-slot suspension point
///
/// Unlike the mailbox suspension point this completes immediately on an
/// already-terminal slot: there is no delivery to single-step, and nothing
/// would ever resume a waiter parked on a settled cell.
struct WaitFuture<'a> {
    slot: &'a StepFutureSlot,
}

impl Future for WaitFuture<'_> {
    type Output = Result<Bytes>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let slot = self.slot;
        let mut state = slot.state.lock().unwrap();

        match &state.value {
            SlotValue::Resolved(value) => Poll::Ready(Ok(value.clone())),
            SlotValue::Failed(error) => Poll::Ready(Err(error.clone())),
            SlotValue::Cancelled => Poll::Ready(Err(Error::future_cancelled(&slot.path))),
            SlotValue::Pending => {
                let task = current_task()
                    .expect("wait must be called from a spawned execution context");
                debug_assert!(
                    state.waiter.is_none() || state.waiter == Some(task),
                    "future slot {} already has a waiter",
                    slot.path
                );
                state.waiter = Some(task);
                record_suspension(SuspendReason::FutureWait);
                Poll::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn slot(path: &str) -> StepFutureSlot {
        StepFutureSlot::new(path.to_string(), Weak::new())
    }

    #[test]
    fn test_first_terminal_call_wins() {
        let slot = slot("ask-0");
        assert!(!slot.is_resolved());

        assert!(slot.resolve(Bytes::from("winner")));
        assert!(slot.is_resolved());

        assert!(!slot.resolve(Bytes::from("loser")));
        assert!(!slot.fail(Error::internal("loser")));
        assert!(!slot.cancel());
    }

    #[test]
    fn test_on_cancel_runs_in_registration_order() {
        let slot = slot("ask-0");
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            slot.on_cancel(Box::new(move || order.lock().unwrap().push(i)));
        }

        assert!(slot.cancel());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_on_cancel_after_cancel_won_runs_immediately() {
        let slot = slot("ask-0");
        slot.cancel();

        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = fired.clone();
        slot.on_cancel(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_cancel_never_runs_when_resolve_wins() {
        let slot = slot("ask-0");

        let fired = Arc::new(AtomicU32::new(0));
        let fired_clone = fired.clone();
        slot.on_cancel(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));

        slot.resolve(Bytes::new());
        assert!(!slot.cancel());
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        // Registering after resolve won is also a no-op
        let fired_clone = fired.clone();
        slot.on_cancel(Box::new(move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
