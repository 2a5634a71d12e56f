//! Logical timer queue for deferred tasks.
//!
//! Times are offsets from an arbitrary origin. The tokio runtime maps them
//! onto `Instant`s; tests advance a manual clock.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use focuskit_core::TimerEvent;

#[derive(Debug)]
struct Entry {
    due: Duration,
    seq: u64,
    event: TimerEvent,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (due, seq)
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Pending deferred tasks ordered by due time
///
/// Tasks due at the same time fire in scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Entry>,
    seq: u64,
}

impl TimerQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event` to fire `delay` after `now`
    pub fn schedule(&mut self, now: Duration, delay: Duration, event: TimerEvent) {
        self.seq += 1;
        self.heap.push(Entry {
            due: now + delay,
            seq: self.seq,
            event,
        });
    }

    /// Due time of the earliest pending task
    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|entry| entry.due)
    }

    /// Pop the earliest task if it is due at `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerEvent> {
        if self.heap.peek()?.due > now {
            return None;
        }
        self.heap.pop().map(|entry| entry.event)
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Check if nothing is pending
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop every pending task
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
