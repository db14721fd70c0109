//! Arrivals and the queue ordering key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util::serde::{PatientId, UrgencyLevel};

/// An admitted patient. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Patient identifier.
    pub patient_id: PatientId,
    /// Urgency classification.
    pub level: UrgencyLevel,
    /// Instant the patient arrived.
    pub arrived_at: DateTime<Utc>,
}

impl Arrival {
    /// Create an arrival.
    #[must_use]
    pub fn new(patient_id: PatientId, level: UrgencyLevel, arrived_at: DateTime<Utc>) -> Self {
        Self {
            patient_id,
            level,
            arrived_at,
        }
    }

    /// Ordering key of this arrival.
    #[must_use]
    pub const fn key(&self) -> QueueKey {
        QueueKey {
            rank: self.level.rank(),
            arrived_at: self.arrived_at,
            patient_id: self.patient_id,
        }
    }
}

/// Total order of queue entries: rank, then arrival time, then patient id.
///
/// The derived `Ord` follows field order, so the smallest key is served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    /// Priority rank; lower is more urgent.
    pub rank: u8,
    /// Arrival instant; earlier wins within a rank.
    pub arrived_at: DateTime<Utc>,
    /// Final tie-break.
    pub patient_id: PatientId,
}

/// A queued patient: its ordering key plus the arrival it was built from.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    /// Ordering key, derived from `arrival` at construction.
    pub key: QueueKey,
    /// The queued arrival.
    pub arrival: Arrival,
}

impl QueueEntry {
    /// Build an entry, computing its rank from the urgency level.
    #[must_use]
    pub fn new(arrival: Arrival) -> Self {
        Self {
            key: arrival.key(),
            arrival,
        }
    }

    /// Patient identifier.
    #[must_use]
    pub const fn patient_id(&self) -> PatientId {
        self.arrival.patient_id
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}
