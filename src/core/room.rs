//! Room: one urgency-ordered queue guarded by its own lock/condition pair.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::config::LevelTable;
use crate::core::patient::{Arrival, QueueEntry, QueueKey};
use crate::infra::queue::{ExpiredEntry, TriageQueue};
use crate::util::serde::RoomId;

/// One room's queue and the condition its doctors wait on.
///
/// Only the owning room inserts; peers may remove the head through
/// [`Room::remove_if_head`] while stealing.
pub struct Room {
    id: RoomId,
    doctors: usize,
    queue: Mutex<TriageQueue>,
    /// Signaled once per enqueue; broadcast on shutdown.
    arrivals: Condvar,
}

impl Room {
    /// Create an empty room served by `doctors` doctors.
    #[must_use]
    pub fn new(id: RoomId, doctors: usize) -> Self {
        Self {
            id,
            doctors,
            queue: Mutex::new(TriageQueue::new()),
            arrivals: Condvar::new(),
        }
    }

    /// Room identifier.
    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.id
    }

    /// Size of the doctor pool.
    #[must_use]
    pub const fn doctor_count(&self) -> usize {
        self.doctors
    }

    /// Queue an arrival and wake one waiting doctor.
    pub fn enqueue(&self, arrival: Arrival) {
        let entry = QueueEntry::new(arrival);
        let depth = {
            let mut queue = self.queue.lock();
            queue.push(entry);
            queue.len()
        };
        self.arrivals.notify_one();
        debug!(room = self.id, depth, "patient queued");
    }

    /// Pop the most urgent entry, if any.
    pub fn try_dequeue(&self) -> Option<QueueEntry> {
        self.queue.lock().pop()
    }

    /// Key of the current head.
    #[must_use]
    pub fn peek_key(&self) -> Option<QueueKey> {
        self.queue.lock().peek_key()
    }

    /// Remove the head if it is still `expected`.
    pub fn remove_if_head(&self, expected: &QueueKey) -> Option<QueueEntry> {
        self.queue.lock().remove_if_head(expected)
    }

    /// Block up to `timeout` for the queue to become non-empty.
    ///
    /// Returns immediately when entries are already queued, so an enqueue that
    /// lands between a failed dequeue and this call is never missed.
    pub fn wait_for_arrival(&self, timeout: Duration) -> bool {
        let mut queue = self.queue.lock();
        if !queue.is_empty() {
            return true;
        }
        let _ = self.arrivals.wait_for(&mut queue, timeout);
        !queue.is_empty()
    }

    /// Wake every doctor blocked on this room.
    pub fn wake_all(&self) {
        self.arrivals.notify_all();
    }

    /// Evict entries that outwaited their level's budget at `now`.
    ///
    /// Only entries still present in the queue under the lock are evicted, so
    /// a patient already taken by a doctor can never be returned here.
    pub fn sweep(&self, now: DateTime<Utc>, levels: &LevelTable) -> Vec<ExpiredEntry> {
        self.queue.lock().drain_expired(now, levels)
    }

    /// Current queue depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Whether nobody is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("doctors", &self.doctors)
            .field("queued", &self.len())
            .finish()
    }
}
