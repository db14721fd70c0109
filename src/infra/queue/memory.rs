//! In-memory triage queue with urgency ordering and wait-budget pruning.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use chrono::{DateTime, Utc};

use crate::config::LevelTable;
use crate::core::patient::{QueueEntry, QueueKey};
use crate::util::clock::seconds_between;

/// An entry evicted by [`TriageQueue::drain_expired`], with the wait it had accumulated.
#[derive(Debug, Clone)]
pub struct ExpiredEntry {
    /// The evicted entry.
    pub entry: QueueEntry,
    /// Seconds waited at eviction time.
    pub waited_secs: f64,
}

/// Min-priority queue of patients for one room.
/// This provides O(log n) push and O(log n) pop; the head is the most urgent,
/// earliest-arrived patient.
#[derive(Debug, Default)]
pub struct TriageQueue {
    /// `Reverse` turns the std max-heap into a min-heap over `QueueKey`.
    entries: BinaryHeap<Reverse<QueueEntry>>,
}

impl TriageQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
        }
    }

    /// Insert an entry.
    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push(Reverse(entry));
    }

    /// Remove and return the head.
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.entries.pop().map(|Reverse(entry)| entry)
    }

    /// Key of the head, if any.
    #[must_use]
    pub fn peek_key(&self) -> Option<QueueKey> {
        self.entries.peek().map(|Reverse(entry)| entry.key)
    }

    /// Pop the head only if it still carries `expected`.
    ///
    /// Used by stealing peers to re-validate a candidate chosen during an
    /// unlocked scan.
    pub fn remove_if_head(&mut self, expected: &QueueKey) -> Option<QueueEntry> {
        if self.peek_key().as_ref() == Some(expected) {
            self.pop()
        } else {
            None
        }
    }

    /// Remove every entry whose wait at `now` exceeds its level's abandon timeout.
    ///
    /// Survivors are re-heapified; evicted entries are returned in queue order.
    pub fn drain_expired(&mut self, now: DateTime<Utc>, levels: &LevelTable) -> Vec<ExpiredEntry> {
        if self.entries.is_empty() {
            return Vec::new();
        }
        let mut expired = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for Reverse(entry) in self.entries.drain() {
            let waited_secs = seconds_between(entry.arrival.arrived_at, now);
            let budget = levels.profile(&entry.arrival.level).abandon_timeout();
            if waited_secs > budget.as_secs_f64() {
                expired.push(ExpiredEntry { entry, waited_secs });
            } else {
                kept.push(Reverse(entry));
            }
        }
        self.entries = BinaryHeap::from(kept);
        expired.sort_by(|a, b| a.entry.key.cmp(&b.entry.key));
        expired
    }

    /// Keys currently queued, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = QueueKey> + '_ {
        self.entries.iter().map(|Reverse(entry)| entry.key)
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
