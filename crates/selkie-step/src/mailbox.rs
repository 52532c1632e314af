//! Step mailbox
//!
//! TigerStyle: Bounded queues with explicit limits, no silent drops.
//!
//! The mailbox is the step runtime's delivery point: a FIFO of envelopes
//! plus a single waiter slot naming the context parked in
//! `dequeue_blocking`. Enqueue never wakes the waiter; the step scan holds
//! the resume right, which is what makes delivery single-steppable.

use crate::context::{current_task, record_suspension, SuspendReason};
use crate::runtime::StepShared;
use async_trait::async_trait;
use chrono::Duration;
use selkie_core::{
    EnqueueResult, Envelope, Error, Mailbox, MailboxConfig, OverflowStrategy, Result, TaskId,
};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, Weak};
use std::task::{Context, Poll};
use tracing::{debug, trace};

struct MailboxState {
    queue: VecDeque<Envelope>,
    closed: bool,
    /// The (at most one) context parked in `dequeue_blocking`
    waiter: Option<TaskId>,
}

/// Mailbox owned by the step runtime
pub struct StepMailbox {
    config: MailboxConfig,
    shared: Weak<StepShared>,
    state: Mutex<MailboxState>,
    /// Total messages accepted (for inspection)
    enqueued_count: AtomicU64,
    /// Total messages handed to a receiver
    processed_count: AtomicU64,
    /// Total messages rejected or evicted by an overflow strategy
    dropped_count: AtomicU64,
}

impl StepMailbox {
    pub(crate) fn new(config: MailboxConfig, shared: Weak<StepShared>) -> Self {
        debug_assert!(config.validate().is_ok(), "config validated on creation");

        Self {
            config,
            shared,
            state: Mutex::new(MailboxState {
                queue: VecDeque::new(),
                closed: false,
                waiter: None,
            }),
            enqueued_count: AtomicU64::new(0),
            processed_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    /// The waiter to resume if this mailbox has deliverable work
    ///
    /// Deliverable means a non-empty queue and a parked receiver; this is
    /// the predicate the step scan and `is_idle` share.
    pub(crate) fn deliverable_waiter(&self) -> Option<TaskId> {
        let state = self.state.lock().unwrap();
        if state.queue.is_empty() {
            None
        } else {
            state.waiter
        }
    }

    /// Total messages accepted into the queue
    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    /// Total messages handed to a receiver
    pub fn processed_count(&self) -> u64 {
        self.processed_count.load(Ordering::Relaxed)
    }

    /// Total messages rejected or evicted on overflow
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    fn note_processed(&self) {
        self.processed_count.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for StepMailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("StepMailbox")
            .field("path", &self.config.path)
            .field("len", &state.queue.len())
            .field("closed", &state.closed)
            .field("waiter", &state.waiter)
            .finish()
    }
}

#[async_trait]
impl Mailbox for StepMailbox {
    fn path(&self) -> &str {
        &self.config.path
    }

    fn enqueue(&self, envelope: Envelope) -> Result<EnqueueResult> {
        let mut state = self.state.lock().unwrap();

        if state.closed {
            return Err(Error::mailbox_closed(&self.config.path));
        }

        if let Some(capacity) = self.config.capacity {
            debug_assert!(state.queue.len() <= capacity);
            if state.queue.len() >= capacity {
                match self.config.overflow {
                    OverflowStrategy::DropNewest => {
                        self.dropped_count.fetch_add(1, Ordering::Relaxed);
                        trace!(path = %self.config.path, "overflow: dropped newest");
                        return Ok(EnqueueResult::Dropped);
                    }
                    OverflowStrategy::DropOldest => {
                        state.queue.pop_front();
                        self.dropped_count.fetch_add(1, Ordering::Relaxed);
                        trace!(path = %self.config.path, "overflow: evicted oldest");
                    }
                    OverflowStrategy::Backpressure => {
                        return Ok(EnqueueResult::Backpressured);
                    }
                    OverflowStrategy::Throw => {
                        return Err(Error::mailbox_overflow(
                            &self.config.path,
                            capacity,
                            OverflowStrategy::Throw,
                        ));
                    }
                }
            }
        }

        state.queue.push_back(envelope);
        self.enqueued_count.fetch_add(1, Ordering::Relaxed);
        Ok(EnqueueResult::Accepted)
    }

    fn dequeue(&self) -> Option<Envelope> {
        let envelope = self.state.lock().unwrap().queue.pop_front();
        if envelope.is_some() {
            self.note_processed();
        }
        envelope
    }

    async fn dequeue_blocking(&self, _timeout: Duration) -> Result<Envelope> {
        // The timeout is accepted for interface compatibility and ignored:
        // honouring it would require real time and break determinism.
        RecvFuture {
            mailbox: self,
            registered: false,
        }
        .await
    }

    fn len(&self) -> usize {
        self.state.lock().unwrap().queue.len()
    }

    fn is_full(&self) -> bool {
        match self.config.capacity {
            Some(capacity) => self.len() >= capacity,
            None => false,
        }
    }

    fn close(&self) {
        let waiter = {
            let mut state = self.state.lock().unwrap();
            if state.closed {
                return;
            }
            state.closed = true;
            state.waiter.take()
        };

        debug!(path = %self.config.path, "mailbox closed");

        // The close owns the one resume; the waiter observes the closed
        // flag (and any remaining queue) when polled.
        if let Some(task) = waiter {
            if let Some(shared) = self.shared.upgrade() {
                shared.resume(task);
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

/// The mailbox suspension point
///
/// First poll parks the context even when the queue is non-empty: every
/// delivery must be a distinct `step`. The resume poll clears the waiter
/// slot and takes the head, or surfaces `MailboxClosed`.
struct RecvFuture<'a> {
    mailbox: &'a StepMailbox,
    registered: bool,
}

impl Future for RecvFuture<'_> {
    type Output = Result<Envelope>;

    fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let path = &this.mailbox.config.path;
        let task = current_task()
            .expect("dequeue_blocking must be called from a spawned execution context");

        let mut state = this.mailbox.state.lock().unwrap();

        if !this.registered {
            if state.closed {
                // Nothing will ever resume a waiter parked on a closed
                // mailbox: complete immediately, draining any remainder.
                return match state.queue.pop_front() {
                    Some(envelope) => {
                        drop(state);
                        this.mailbox.note_processed();
                        Poll::Ready(Ok(envelope))
                    }
                    None => Poll::Ready(Err(Error::mailbox_closed(path))),
                };
            }

            assert!(
                state.waiter.is_none(),
                "mailbox {} already has a waiter",
                path
            );
            state.waiter = Some(task);
            this.registered = true;
            record_suspension(SuspendReason::StepWait);
            return Poll::Pending;
        }

        // Resumed by the step scan (delivery) or by close.
        debug_assert!(
            state.waiter.is_none() || state.waiter == Some(task),
            "mailbox {} waiter changed while parked",
            path
        );
        state.waiter = None;

        if let Some(envelope) = state.queue.pop_front() {
            drop(state);
            this.mailbox.note_processed();
            Poll::Ready(Ok(envelope))
        } else if state.closed {
            Poll::Ready(Err(Error::mailbox_closed(path)))
        } else {
            // Spurious resume: park again and wait for a real delivery.
            state.waiter = Some(task);
            record_suspension(SuspendReason::StepWait);
            Poll::Pending
        }
    }
}
