//! Execution contexts
//!
//! An execution context is an actor's run loop made resumable: a manually
//! polled boxed future that the runtime drives between the two legal
//! suspension points (parked on a mailbox, parked on a future slot).
//!
//! The poll stack is how a suspension point learns who is suspending: the
//! runtime pushes a frame before polling a context and pops it after, and
//! the suspension point records its reason into the top frame right before
//! returning `Poll::Pending`. Frames nest, because a running context may
//! resolve a future slot and thereby resume a different, suspended context
//! in place.

use selkie_core::{TaskFuture, TaskId};
use std::cell::RefCell;

/// Why a context is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendReason {
    /// Parked in `dequeue_blocking`, waiting for the step scan to deliver
    StepWait,
    /// Parked in `FutureSlot::wait`, waiting for a terminal transition
    FutureWait,
}

/// Lifecycle of an execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    /// Registered but never polled; the next `step` starts it
    NotStarted,
    /// Being polled right now
    Running,
    /// Parked at one of the two suspension points
    Suspended(SuspendReason),
    /// Run loop returned; removed at the next sweep
    Terminated,
}

/// A registered actor run loop
pub struct ExecutionContext {
    name: String,
    status: ContextStatus,
    future: Option<TaskFuture>,
}

impl ExecutionContext {
    pub(crate) fn new(id: TaskId, future: TaskFuture) -> Self {
        Self {
            name: format!("step-{}", id.0),
            status: ContextStatus::NotStarted,
            future: Some(future),
        }
    }

    /// The context's name, of the form `step-<n>`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The context's current lifecycle status
    pub fn status(&self) -> ContextStatus {
        self.status
    }

    pub(crate) fn is_not_started(&self) -> bool {
        self.status == ContextStatus::NotStarted
    }

    pub(crate) fn is_suspended(&self) -> bool {
        matches!(self.status, ContextStatus::Suspended(_))
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.status == ContextStatus::Terminated
    }

    /// Whether the runtime may poll this context now
    pub(crate) fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            ContextStatus::NotStarted | ContextStatus::Suspended(_)
        )
    }

    /// Take the future out for polling and mark the context running
    pub(crate) fn begin_poll(&mut self) -> Option<TaskFuture> {
        debug_assert!(self.is_resumable(), "begin_poll on {}", self.name);
        self.status = ContextStatus::Running;
        let future = self.future.take();
        debug_assert!(future.is_some(), "resumable context {} lost its future", self.name);
        future
    }

    /// Put the future back after a `Poll::Pending`
    pub(crate) fn park(&mut self, future: TaskFuture, reason: SuspendReason) {
        debug_assert!(self.status == ContextStatus::Running);
        self.future = Some(future);
        self.status = ContextStatus::Suspended(reason);
    }

    /// Mark the context finished after a `Poll::Ready`
    pub(crate) fn finish(&mut self) {
        debug_assert!(self.status == ContextStatus::Running);
        self.future = None;
        self.status = ContextStatus::Terminated;
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.name)
            .field("status", &self.status)
            .finish()
    }
}

// =============================================================================
// Poll stack
// =============================================================================

struct PollFrame {
    task: TaskId,
    reason: Option<SuspendReason>,
}

thread_local! {
    static POLL_STACK: RefCell<Vec<PollFrame>> = const { RefCell::new(Vec::new()) };
}

/// The context currently being polled on this thread, if any
pub(crate) fn current_task() -> Option<TaskId> {
    POLL_STACK.with(|stack| stack.borrow().last().map(|frame| frame.task))
}

pub(crate) fn push_poll_frame(task: TaskId) {
    POLL_STACK.with(|stack| {
        stack.borrow_mut().push(PollFrame { task, reason: None });
    });
}

/// Pop the current frame, returning the recorded suspension reason
pub(crate) fn pop_poll_frame() -> Option<SuspendReason> {
    POLL_STACK.with(|stack| {
        let frame = stack
            .borrow_mut()
            .pop()
            .expect("poll stack underflow");
        frame.reason
    })
}

/// Record why the context on top of the poll stack is about to suspend
///
/// Must be called by a suspension point immediately before it returns
/// `Poll::Pending`; suspending anywhere else is a contract violation.
pub(crate) fn record_suspension(reason: SuspendReason) {
    POLL_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let frame = stack
            .last_mut()
            .expect("suspension outside a context poll");
        frame.reason = Some(reason);
    });
}
