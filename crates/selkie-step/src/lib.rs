//! Selkie Step Runtime
//!
//! Deterministic step-driven execution runtime for Selkie actors: a
//! testing-oriented scheduler that replaces wall-clock time, OS threads,
//! and preemption with explicit, externally-driven progress.
//!
//! # Overview
//!
//! - `step()` advances the system by exactly one user-observable unit of
//!   work: one envelope delivered to one actor.
//! - `advance_time(d)` advances a virtual clock and fires matured timers.
//! - Nothing else moves. Two identical operation sequences produce
//!   identical observable sequences.
//!
//! Actor loops are ordinary async blocks spawned onto the runtime; the
//! runtime itself is the executor and polls them only when the controller
//! steps. The two suspension points (waiting on a mailbox, waiting on a
//! future slot) are the only places a loop may park.
//!
//! # Example
//!
//! ```rust
//! use selkie_core::{Envelope, Mailbox, MailboxConfig, Runtime};
//! use selkie_step::StepRuntime;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let runtime = StepRuntime::new();
//! let mailbox = runtime
//!     .create_mailbox(MailboxConfig::unbounded("user/counter"))
//!     .unwrap();
//!
//! let count = Arc::new(AtomicU64::new(0));
//! let (mb, seen) = (mailbox.clone(), count.clone());
//! runtime.spawn(Box::pin(async move {
//!     while let Ok(_envelope) = mb.dequeue_blocking(chrono::Duration::seconds(5)).await {
//!         seen.fetch_add(1, Ordering::SeqCst);
//!     }
//! }));
//!
//! mailbox
//!     .enqueue(Envelope::new("increment", bytes::Bytes::new()))
//!     .unwrap();
//!
//! assert!(runtime.step()); // delivers exactly one envelope
//! assert_eq!(count.load(Ordering::SeqCst), 1);
//! assert!(!runtime.step()); // idle
//! ```

pub mod clock;
pub mod context;
pub mod mailbox;
pub mod runtime;
pub mod slot;
mod timer;

pub use clock::{VirtualClock, CLOCK_EPOCH_DEFAULT};
pub use context::{ContextStatus, ExecutionContext, SuspendReason};
pub use mailbox::StepMailbox;
pub use runtime::StepRuntime;
pub use slot::StepFutureSlot;
