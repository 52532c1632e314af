//! Timer queue
//!
//! Timers are pure data until `advance_time` visits them. The queue is an
//! insertion-ordered list rescanned per advance; firing-order ties break on
//! the monotone sequence number, which a repeating timer keeps across
//! re-installs so catching up never reorders it behind later arrivals.

use selkie_core::{Cancellable, OnceCallback, RepeatCallback, TIMER_COUNT_MAX};

/// What firing a timer does
pub(crate) enum TimerKind {
    /// Fires once, then the entry is dropped
    Once(Option<OnceCallback>),
    /// Fires every `interval_us`, anchored to the schedule
    Repeating {
        callback: RepeatCallback,
        interval_us: i64,
    },
}

/// One scheduled callback
pub(crate) struct TimerEntry {
    seq: u64,
    pub(crate) fire_at_us: i64,
    pub(crate) kind: TimerKind,
    pub(crate) cancellable: Cancellable,
}

impl TimerEntry {
    pub(crate) fn seq(&self) -> u64 {
        self.seq
    }
}

impl std::fmt::Debug for TimerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEntry")
            .field("seq", &self.seq)
            .field("fire_at_us", &self.fire_at_us)
            .field("repeating", &matches!(self.kind, TimerKind::Repeating { .. }))
            .field("cancelled", &self.cancellable.is_cancelled())
            .finish()
    }
}

/// Insertion-ordered timer storage
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    /// Sorted by `seq` ascending (insertion order)
    entries: Vec<TimerEntry>,
    next_seq: u64,
}

impl TimerQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-cancelled) timers
    pub(crate) fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.cancellable.is_cancelled())
            .count()
    }

    pub(crate) fn schedule_once(&mut self, fire_at_us: i64, callback: OnceCallback) -> Cancellable {
        self.install(fire_at_us, TimerKind::Once(Some(callback)))
    }

    pub(crate) fn schedule_repeating(
        &mut self,
        fire_at_us: i64,
        interval_us: i64,
        callback: RepeatCallback,
    ) -> Cancellable {
        debug_assert!(interval_us > 0, "repeat interval must be positive");
        self.install(
            fire_at_us,
            TimerKind::Repeating {
                callback,
                interval_us,
            },
        )
    }

    fn install(&mut self, fire_at_us: i64, kind: TimerKind) -> Cancellable {
        assert!(self.entries.len() < TIMER_COUNT_MAX, "timer registry full");

        let cancellable = Cancellable::new();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(TimerEntry {
            seq,
            fire_at_us,
            kind,
            cancellable: cancellable.clone(),
        });
        cancellable
    }

    /// Extract due entries in insertion order, dropping cancelled entries
    ///
    /// Cancelled timers are removed here whether due or not; they never
    /// fire.
    pub(crate) fn take_due(&mut self, now_us: i64) -> Vec<TimerEntry> {
        let mut due = Vec::new();
        let entries = std::mem::take(&mut self.entries);

        for entry in entries {
            if entry.cancellable.is_cancelled() {
                continue;
            }
            if entry.fire_at_us <= now_us {
                due.push(entry);
            } else {
                self.entries.push(entry);
            }
        }

        due
    }

    /// Put a repeating entry back at its original insertion position
    pub(crate) fn reinstall(&mut self, entry: TimerEntry) {
        debug_assert!(matches!(entry.kind, TimerKind::Repeating { .. }));

        let at = self.entries.partition_point(|e| e.seq < entry.seq);
        self.entries.insert(at, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> OnceCallback {
        Box::new(|| {})
    }

    #[test]
    fn test_take_due_in_insertion_order() {
        let mut queue = TimerQueue::new();
        // Inserted later but due earlier
        queue.schedule_once(2_000, noop());
        queue.schedule_once(1_000, noop());
        queue.schedule_once(5_000, noop());

        let due = queue.take_due(3_000);
        let seqs: Vec<u64> = due.iter().map(TimerEntry::seq).collect();
        assert_eq!(seqs, vec![0, 1]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_cancelled_entries_are_dropped_without_firing() {
        let mut queue = TimerQueue::new();
        let due_token = queue.schedule_once(1_000, noop());
        let pending_token = queue.schedule_once(9_000, noop());
        assert_eq!(queue.len(), 2);

        due_token.cancel();
        pending_token.cancel();

        // Both cancelled entries vanish in the same sweep, even the one
        // whose deadline is still in the future.
        assert!(queue.take_due(2_000).is_empty());
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_reinstall_preserves_insertion_position() {
        let mut queue = TimerQueue::new();
        queue.schedule_repeating(1_000, 1_000, Box::new(|| {}));
        queue.schedule_once(1_500, noop());

        let mut due = queue.take_due(1_000);
        assert_eq!(due.len(), 1);

        let mut entry = due.pop().unwrap();
        entry.fire_at_us += 1_000;
        queue.reinstall(entry);

        // The repeating timer (seq 0) still precedes the one-shot (seq 1)
        let due = queue.take_due(2_000);
        let seqs: Vec<u64> = due.iter().map(TimerEntry::seq).collect();
        assert_eq!(seqs, vec![0, 1]);
    }
}
