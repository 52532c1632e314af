//! Step runtime
//!
//! TigerStyle: Single entry point, explicit registries, bounded iteration.
//!
//! The runtime owns every registry (contexts keyed by monotone `TaskId`,
//! mailboxes in creation order, timers in insertion order) and funnels all
//! progress through two controller calls: `step()` delivers exactly one
//! envelope (or reports idleness) and `advance_time()` moves the virtual
//! clock and fires matured timers. No lock is ever held across a context
//! poll or a timer callback, so resumed actors may freely enqueue, spawn,
//! schedule, and settle future slots.

use crate::clock::{duration_us, VirtualClock};
use crate::context::{pop_poll_frame, push_poll_frame, ExecutionContext};
use crate::mailbox::StepMailbox;
use crate::slot::StepFutureSlot;
use crate::timer::{TimerKind, TimerQueue};
use async_trait::async_trait;
use chrono::Duration;
use futures::task::noop_waker;
use selkie_core::{
    Cancellable, Error, FutureSlot, Mailbox, MailboxConfig, OnceCallback, RepeatCallback, Result,
    Runtime, TaskFuture, TaskId, CONTEXT_COUNT_MAX, DRAIN_STEPS_COUNT_MAX, MAILBOX_COUNT_MAX,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tracing::{debug, info, trace, warn};

/// State shared between the runtime handle, its mailboxes, and its slots
pub(crate) struct StepShared {
    clock: Arc<VirtualClock>,
    /// Keyed by monotone id, so iteration order is creation order
    contexts: Mutex<BTreeMap<TaskId, ExecutionContext>>,
    /// Creation order is the delivery tie-break
    mailboxes: Mutex<Vec<Arc<StepMailbox>>>,
    timers: Mutex<TimerQueue>,
    running: AtomicBool,
    next_task: AtomicU64,
    next_slot: AtomicU64,
}

impl StepShared {
    /// Poll a context once
    ///
    /// This is the single resume point: the step scan, `close`, and
    /// future-slot settlement all funnel through it. The context's future
    /// is taken out of the registry for the duration of the poll, so the
    /// polled code can re-enter the runtime (and even trigger a nested
    /// resume of a different context).
    pub(crate) fn resume(self: &Arc<Self>, task: TaskId) {
        let future = {
            let mut contexts = self.contexts.lock().unwrap();
            let Some(context) = contexts.get_mut(&task) else {
                debug_assert!(false, "resume of unknown context {}", task);
                return;
            };
            if !context.is_resumable() {
                debug_assert!(false, "resume of non-resumable context {}", context.name());
                return;
            }
            context.begin_poll()
        };
        let Some(mut future) = future else {
            return;
        };

        push_poll_frame(task);
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let poll = future.as_mut().poll(&mut cx);
        let reason = pop_poll_frame();

        let mut contexts = self.contexts.lock().unwrap();
        let Some(context) = contexts.get_mut(&task) else {
            return;
        };
        match poll {
            Poll::Ready(()) => {
                context.finish();
                debug!(task = %context.name(), "context terminated");
            }
            Poll::Pending => {
                // The two legal suspension points record their reason;
                // anything else is a contract violation.
                let reason =
                    reason.expect("context suspended outside dequeue_blocking or future wait");
                context.park(future, reason);
            }
        }
    }

    fn sweep_terminated(&self) {
        self.contexts
            .lock()
            .unwrap()
            .retain(|_, context| !context.is_terminated());
    }
}

/// Deterministic step-driven execution runtime
///
/// Replaces wall-clock time, OS threads, and preemption with explicit,
/// externally-driven progress: each `step()` advances the system by exactly
/// one delivered envelope, and `advance_time(d)` is the only source of
/// time. No background concurrency exists.
pub struct StepRuntime {
    shared: Arc<StepShared>,
}

impl StepRuntime {
    /// Create a runtime with the default clock epoch
    pub fn new() -> Self {
        Self::with_clock(VirtualClock::default())
    }

    /// Create a runtime around a pre-configured clock
    pub fn with_clock(clock: VirtualClock) -> Self {
        Self {
            shared: Arc::new(StepShared {
                clock: Arc::new(clock),
                contexts: Mutex::new(BTreeMap::new()),
                mailboxes: Mutex::new(Vec::new()),
                timers: Mutex::new(TimerQueue::new()),
                running: AtomicBool::new(false),
                next_task: AtomicU64::new(0),
                next_slot: AtomicU64::new(0),
            }),
        }
    }

    /// The runtime's clock, the same instance the actor system observes
    pub fn clock(&self) -> Arc<VirtualClock> {
        self.shared.clock.clone()
    }

    /// Advance the system by one unit of user-observable work
    ///
    /// Starts any not-yet-started contexts (each runs to its first
    /// suspension), then scans mailboxes in creation order and resumes the
    /// first parked receiver with a non-empty queue. Returns `false` when
    /// no mailbox had deliverable work.
    pub fn step(&self) -> bool {
        self.start_unstarted();
        self.shared.sweep_terminated();

        let mailboxes: Vec<Arc<StepMailbox>> = self.shared.mailboxes.lock().unwrap().clone();
        for mailbox in mailboxes {
            let Some(task) = mailbox.deliverable_waiter() else {
                continue;
            };
            let suspended = {
                let contexts = self.shared.contexts.lock().unwrap();
                contexts
                    .get(&task)
                    .map(ExecutionContext::is_suspended)
                    .unwrap_or(false)
            };
            // Waiter bookkeeping and context status must agree
            debug_assert!(suspended, "mailbox {} waiter is not suspended", mailbox.path());
            if !suspended {
                continue;
            }

            trace!(path = %mailbox.path(), task = %task, "step delivers to waiter");
            self.shared.resume(task);
            self.shared.sweep_terminated();
            return true;
        }

        trace!("step found no deliverable work");
        false
    }

    /// Step until idle; returns the number of steps performed
    pub fn drain(&self) -> u64 {
        let mut steps = 0u64;
        while self.step() {
            steps += 1;
            assert!(
                steps <= DRAIN_STEPS_COUNT_MAX,
                "drain exceeded {} steps: actors are livelocked",
                DRAIN_STEPS_COUNT_MAX
            );
        }
        steps
    }

    /// Advance the virtual clock and fire matured timers
    ///
    /// Due timers fire in insertion order. A repeating timer catches up
    /// (one firing per elapsed interval, cadence anchored to the schedule)
    /// before the next due timer fires, and its cancellation flag is
    /// re-checked before every firing. Timers installed by callbacks during
    /// the call wait for the next `advance_time`. Callbacks may enqueue
    /// messages; they do not implicitly drain the system.
    pub fn advance_time(&self, duration: Duration) {
        assert!(
            duration >= Duration::zero(),
            "advance_time requires a non-negative duration"
        );

        self.shared.clock.advance(duration);
        let now_us = self.shared.clock.now_us();

        let due = self.shared.timers.lock().unwrap().take_due(now_us);
        trace!(now_us, due = due.len(), "advancing time");

        for mut entry in due {
            // An earlier callback in this batch may have cancelled it
            if entry.cancellable.is_cancelled() {
                continue;
            }
            let seq = entry.seq();

            match &mut entry.kind {
                TimerKind::Once(callback) => {
                    trace!(seq, "one-shot timer fired");
                    if let Some(callback) = callback.take() {
                        callback();
                    }
                }
                TimerKind::Repeating { callback, interval_us } => {
                    let interval_us = *interval_us;
                    while entry.fire_at_us <= now_us && !entry.cancellable.is_cancelled() {
                        trace!(seq, fire_at_us = entry.fire_at_us, "repeating timer fired");
                        callback();
                        // Next due instant is the schedule plus one
                        // interval, never `now + interval`: cadence is
                        // preserved across missed ticks.
                        entry.fire_at_us += interval_us;
                    }
                    if !entry.cancellable.is_cancelled() {
                        self.shared.timers.lock().unwrap().reinstall(entry);
                    }
                }
            }
        }
    }

    /// Sum of all mailbox queue lengths
    pub fn pending_message_count(&self) -> usize {
        self.shared
            .mailboxes
            .lock()
            .unwrap()
            .iter()
            .map(|mailbox| mailbox.len())
            .sum()
    }

    /// True iff no mailbox has both a non-empty queue and a parked receiver
    ///
    /// Equivalently: `step()` would return `false` (modulo not-yet-started
    /// contexts, which `step` starts first).
    pub fn is_idle(&self) -> bool {
        let mailboxes: Vec<Arc<StepMailbox>> = self.shared.mailboxes.lock().unwrap().clone();
        for mailbox in mailboxes {
            let Some(task) = mailbox.deliverable_waiter() else {
                continue;
            };
            let contexts = self.shared.contexts.lock().unwrap();
            if contexts
                .get(&task)
                .map(ExecutionContext::is_suspended)
                .unwrap_or(false)
            {
                return false;
            }
        }
        true
    }

    /// Number of registered execution contexts
    pub fn context_count(&self) -> usize {
        self.shared.contexts.lock().unwrap().len()
    }

    /// Number of registered mailboxes
    pub fn mailbox_count(&self) -> usize {
        self.shared.mailboxes.lock().unwrap().len()
    }

    /// Number of live timers
    pub fn timer_count(&self) -> usize {
        self.shared.timers.lock().unwrap().len()
    }

    fn start_unstarted(&self) {
        let pending: Vec<TaskId> = {
            let contexts = self.shared.contexts.lock().unwrap();
            contexts
                .iter()
                .filter(|(_, context)| context.is_not_started())
                .map(|(task, _)| *task)
                .collect()
        };

        for task in pending {
            debug!(task = %task, "starting context");
            self.shared.resume(task);
        }
    }
}

impl Default for StepRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runtime for StepRuntime {
    fn name(&self) -> &'static str {
        "step"
    }

    fn create_mailbox(&self, config: MailboxConfig) -> Result<Arc<dyn Mailbox>> {
        config.validate()?;

        let mailbox = Arc::new(StepMailbox::new(config, Arc::downgrade(&self.shared)));
        {
            let mut mailboxes = self.shared.mailboxes.lock().unwrap();
            assert!(mailboxes.len() < MAILBOX_COUNT_MAX, "mailbox registry full");
            mailboxes.push(mailbox.clone());
        }

        debug!(path = %mailbox.path(), "mailbox created");
        Ok(mailbox)
    }

    fn create_future_slot(&self, timeout: Duration) -> Arc<dyn FutureSlot> {
        assert!(timeout > Duration::zero(), "ask timeout must be positive");

        let n = self.shared.next_slot.fetch_add(1, Ordering::SeqCst);
        let path = format!("ask-{}", n);
        let slot = Arc::new(StepFutureSlot::new(
            path.clone(),
            Arc::downgrade(&self.shared),
        ));

        // The timeout timer holds the slot weakly so an abandoned ask is
        // not kept alive until its deadline; `fail` after settlement is a
        // no-op, so a late firing is harmless.
        let weak = Arc::downgrade(&slot);
        let timeout_ms = timeout.num_milliseconds() as u64;
        self.schedule_once(
            timeout,
            Box::new(move || {
                if let Some(slot) = weak.upgrade() {
                    slot.fail(Error::ask_timeout(&path, timeout_ms));
                }
            }),
        );

        debug!(path = %slot.path(), timeout_ms, "future slot created");
        slot
    }

    fn spawn(&self, actor_loop: TaskFuture) -> TaskId {
        let task = TaskId(self.shared.next_task.fetch_add(1, Ordering::SeqCst));
        let context = ExecutionContext::new(task, actor_loop);

        let mut contexts = self.shared.contexts.lock().unwrap();
        assert!(contexts.len() < CONTEXT_COUNT_MAX, "context registry full");
        debug!(task = %context.name(), "context registered");
        contexts.insert(task, context);
        task
    }

    fn schedule_once(&self, delay: Duration, callback: OnceCallback) -> Cancellable {
        assert!(delay >= Duration::zero(), "timer delay must be non-negative");

        let fire_at_us = self.shared.clock.now_us() + duration_us(delay);
        self.shared
            .timers
            .lock()
            .unwrap()
            .schedule_once(fire_at_us, callback)
    }

    fn schedule_repeatedly(
        &self,
        initial_delay: Duration,
        interval: Duration,
        callback: RepeatCallback,
    ) -> Cancellable {
        assert!(
            initial_delay >= Duration::zero(),
            "timer delay must be non-negative"
        );
        assert!(interval > Duration::zero(), "repeat interval must be positive");

        let fire_at_us = self.shared.clock.now_us() + duration_us(initial_delay);
        self.shared
            .timers
            .lock()
            .unwrap()
            .schedule_repeating(fire_at_us, duration_us(interval), callback)
    }

    async fn yield_now(&self) {
        // No cooperative contention exists; nothing to yield to.
        trace!("yield_now is a no-op on the step runtime");
    }

    async fn sleep(&self, duration: Duration) {
        // Honouring this would require real time. A caller that expected
        // time to pass must use advance_time instead.
        warn!(
            duration_ms = duration.num_milliseconds(),
            "sleep is inert on the step runtime; advance the virtual clock instead"
        );
    }

    fn run(&self) {
        self.shared.running.store(true, Ordering::SeqCst);
        info!("step runtime running");
        let steps = self.drain();
        self.shared.running.store(false, Ordering::SeqCst);
        info!(steps, "step runtime quiescent");
    }

    fn shutdown(&self, _timeout: Duration) {
        self.shared.running.store(false, Ordering::SeqCst);

        // Closing wakes each parked receiver, which drains its queue,
        // observes MailboxClosed, and terminates.
        let mailboxes: Vec<Arc<StepMailbox>> = self.shared.mailboxes.lock().unwrap().clone();
        for mailbox in &mailboxes {
            mailbox.close();
        }

        self.shared.sweep_terminated();
        info!("step runtime shut down");
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}
