//! Selkie Core
//!
//! Core types, errors, and interfaces for the Selkie actor runtime.
//!
//! # Overview
//!
//! Selkie separates the actor system's vocabulary from its schedulers. This
//! crate holds the shared surface (envelopes, the mailbox and future-slot
//! interfaces, the runtime trait, cancellation tokens, time abstraction,
//! error taxonomy) while runtime crates provide the scheduling. The
//! deterministic step-driven runtime lives in `selkie-step`.
//!
//! # TigerStyle
//!
//! This crate follows TigerStyle engineering principles:
//! - Safety > Performance > Developer Experience
//! - Explicit limits with big-endian naming (e.g., `MAILBOX_CAPACITY_COUNT_MAX`)
//! - Assertions on function contracts
//! - No recursion (bounded iteration only)

pub mod cancel;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod io;
pub mod mailbox;
pub mod runtime;
pub mod slot;
pub mod telemetry;

pub use cancel::Cancellable;
pub use constants::*;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use io::{TimeProvider, WallClockTime};
pub use mailbox::{EnqueueResult, Mailbox, MailboxConfig, OverflowStrategy};
pub use runtime::{OnceCallback, RepeatCallback, Runtime, TaskFuture, TaskId};
pub use slot::{CancelCallback, FutureSlot};
pub use telemetry::{init_telemetry, TelemetryConfig};
