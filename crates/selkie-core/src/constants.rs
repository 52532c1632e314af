//! TigerStyle constants for Selkie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

// =============================================================================
// Mailbox Limits
// =============================================================================

/// Maximum capacity of a bounded mailbox
pub const MAILBOX_CAPACITY_COUNT_MAX: usize = 10_000;

/// Maximum number of mailboxes registered with one runtime
pub const MAILBOX_COUNT_MAX: usize = 100_000;

// =============================================================================
// Message Limits
// =============================================================================

/// Maximum size of a message payload in bytes (1 MB)
pub const MESSAGE_SIZE_BYTES_MAX: usize = 1024 * 1024;

/// Maximum length of an envelope operation name in bytes
pub const OPERATION_LENGTH_BYTES_MAX: usize = 256;

// =============================================================================
// Scheduling Limits
// =============================================================================

/// Maximum number of execution contexts registered with one runtime
pub const CONTEXT_COUNT_MAX: usize = 100_000;

/// Maximum number of live timers registered with one runtime
pub const TIMER_COUNT_MAX: usize = 10_000;

/// Maximum steps a single drain may perform before it is declared a livelock
pub const DRAIN_STEPS_COUNT_MAX: u64 = 1_000_000;

// Compile-time assertions for constant validity
const _: () = {
    assert!(MAILBOX_CAPACITY_COUNT_MAX >= 1);
    assert!(MESSAGE_SIZE_BYTES_MAX <= 16 * 1024 * 1024); // <= 16 MB
    assert!(OPERATION_LENGTH_BYTES_MAX >= 64);
    assert!(DRAIN_STEPS_COUNT_MAX >= 1000);
    assert!(TIMER_COUNT_MAX >= 100);
};
