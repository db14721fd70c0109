//! Scheduler: owns every room plus the shared log and registry.
//!
//! A single `Arc<Scheduler>` is handed to each doctor and sweeper thread, so
//! the set of rooms is fixed for the lifetime of a run and nothing is global.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, LevelTable};
use crate::core::event_log::EventLog;
use crate::core::occupancy::OccupancyRegistry;
use crate::core::patient::{Arrival, QueueEntry};
use crate::core::room::Room;
use crate::core::stealing::{steal, StealTier};
use crate::core::TriageError;
use crate::util::clock;
use crate::util::serde::{DoctorKey, RoomId};

/// Work handed to a doctor by [`Scheduler::acquire`].
#[derive(Debug, Clone)]
pub struct Acquired {
    /// The patient to serve.
    pub entry: QueueEntry,
    /// Peer room it was stolen from, if it did not come from the doctor's own room.
    pub stolen_from: Option<(RoomId, StealTier)>,
}

/// Outcome of one service, as recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ServiceOutcome {
    /// Service start.
    pub started_at: DateTime<Utc>,
    /// Service end.
    pub ended_at: DateTime<Utc>,
}

/// Rooms, event log, occupancy and the round-robin admission cursor.
pub struct Scheduler {
    rooms: Vec<Room>,
    log: Arc<EventLog>,
    occupancy: Arc<OccupancyRegistry>,
    levels: LevelTable,
    steal_poll: Duration,
    next_room: AtomicUsize,
    shutdown: AtomicBool,
}

impl Scheduler {
    /// Build the rooms described by `config` around an existing log and registry.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidConfig` if the configuration is invalid.
    pub fn new(
        config: &EngineConfig,
        log: Arc<EventLog>,
        occupancy: Arc<OccupancyRegistry>,
    ) -> Result<Self, TriageError> {
        config.validate().map_err(TriageError::InvalidConfig)?;
        let rooms = (0..config.rooms)
            .map(|id| Room::new(id, config.doctors_per_room))
            .collect();
        Ok(Self {
            rooms,
            log,
            occupancy,
            levels: config.levels.clone(),
            steal_poll: config.steal_poll_interval(),
            next_room: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Admit an arrival: write its record, then queue it in the next room in
    /// round-robin order. Returns the chosen room.
    pub fn admit(&self, arrival: Arrival) -> RoomId {
        self.log.record_arrival(&arrival);
        let room = self.next_room.fetch_add(1, Ordering::Relaxed) % self.rooms.len();
        info!(
            patient_id = arrival.patient_id,
            level = %arrival.level,
            room,
            "patient admitted"
        );
        self.rooms[room].enqueue(arrival);
        room
    }

    /// Block until `room` has work for one of its doctors, stealing from peers
    /// when its own queue is empty.
    ///
    /// Returns `None` once shutdown has been requested.
    pub fn acquire(&self, room: RoomId) -> Option<Acquired> {
        let own = &self.rooms[room];
        loop {
            if self.is_shutdown() {
                return None;
            }
            if let Some(entry) = own.try_dequeue() {
                return Some(Acquired {
                    entry,
                    stolen_from: None,
                });
            }
            if let Some(stolen) = steal(&self.rooms, room) {
                return Some(Acquired {
                    entry: stolen.entry,
                    stolen_from: Some((stolen.from, stolen.tier)),
                });
            }
            // Peers never signal this room; the bounded wait is what lets an
            // idle doctor notice their arrivals.
            own.wait_for_arrival(self.steal_poll);
        }
    }

    /// Serve one patient: record the start, hold the doctor for the level's
    /// service duration, record the end. Always runs to completion.
    ///
    /// Returns `None` if the record refused the start transition, in which
    /// case no service takes place.
    pub fn serve(&self, doctor: DoctorKey, work: Acquired) -> Option<ServiceOutcome> {
        let Acquired { entry, stolen_from } = work;
        let patient_id = entry.patient_id();
        let level = &entry.arrival.level;
        let profile = self.levels.profile(level);

        if let Some((from, tier)) = stolen_from {
            info!(patient_id, from, to = doctor.room, ?tier, "patient borrowed from peer room");
        }

        let started_at = clock::now();
        if let Err(e) = self.log.start_service(patient_id, doctor, doctor.room, started_at) {
            warn!(patient_id, doctor = %doctor, error = %e, "service start rejected");
            return None;
        }
        self.occupancy.mark_busy(doctor, doctor.room);
        debug!(patient_id, doctor = %doctor, level = %level, "service started");

        thread::sleep(profile.service_duration());

        let ended_at = clock::now();
        if let Err(e) = self.log.complete_service(patient_id, ended_at) {
            warn!(patient_id, doctor = %doctor, error = %e, "service completion rejected");
        }
        self.occupancy.mark_free(doctor);
        info!(
            patient_id,
            doctor = %doctor,
            level = %level,
            waited_secs = clock::seconds_between(entry.arrival.arrived_at, started_at),
            service_secs = clock::seconds_between(started_at, ended_at),
            "service completed"
        );
        Some(ServiceOutcome {
            started_at,
            ended_at,
        })
    }

    /// Evict and log every patient in `room` whose wait exceeds its budget at `now`.
    ///
    /// Returns how many abandonments were recorded.
    pub fn sweep_room(&self, room: RoomId, now: DateTime<Utc>) -> usize {
        let expired = self.rooms[room].sweep(now, &self.levels);
        let mut recorded = 0;
        for evicted in expired {
            let patient_id = evicted.entry.patient_id();
            match self.log.abandon(patient_id, room, now, evicted.waited_secs) {
                Ok(_) => {
                    recorded += 1;
                    info!(
                        patient_id,
                        room,
                        level = %evicted.entry.arrival.level,
                        waited_secs = evicted.waited_secs,
                        "patient abandoned queue"
                    );
                }
                Err(e) => warn!(patient_id, room, error = %e, "abandonment rejected"),
            }
        }
        recorded
    }

    /// Ask every doctor to stop after its current service.
    pub fn request_shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            for room in &self.rooms {
                room.wake_all();
            }
        }
    }

    /// Whether shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// All rooms, in id order.
    #[must_use]
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Current queue depth of each room.
    #[must_use]
    pub fn queue_depths(&self) -> Vec<usize> {
        self.rooms.iter().map(Room::len).collect()
    }

    /// The shared event log.
    #[must_use]
    pub fn log(&self) -> &Arc<EventLog> {
        &self.log
    }

    /// The shared occupancy registry.
    #[must_use]
    pub fn occupancy(&self) -> &Arc<OccupancyRegistry> {
        &self.occupancy
    }

    /// Urgency profiles in force.
    #[must_use]
    pub const fn levels(&self) -> &LevelTable {
        &self.levels
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("rooms", &self.rooms)
            .field("shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UrgencyProfile;
    use crate::core::event_log::PatientState;
    use crate::util::serde::UrgencyLevel;
    use chrono::Duration as ChronoDuration;

    fn scheduler(rooms: usize, doctors: usize) -> Scheduler {
        let config = EngineConfig::in_memory(rooms, doctors)
            .with_levels(LevelTable::uniform(UrgencyProfile::from_millis(5, 60_000)))
            .with_steal_poll_interval(Duration::from_millis(10));
        Scheduler::new(
            &config,
            Arc::new(EventLog::in_memory()),
            Arc::new(OccupancyRegistry::new(rooms, doctors)),
        )
        .unwrap()
    }

    #[test]
    fn admission_is_round_robin() {
        let s = scheduler(3, 1);
        let now = Utc::now();
        let rooms: Vec<_> = (0..5)
            .map(|id| s.admit(Arrival::new(id, UrgencyLevel::Standard, now)))
            .collect();
        assert_eq!(rooms, vec![0, 1, 2, 0, 1]);
        assert_eq!(s.queue_depths(), vec![2, 2, 1]);
        assert_eq!(s.log().len(), 5);
    }

    #[test]
    fn own_queue_preferred_over_peers() {
        let s = scheduler(2, 1);
        let now = Utc::now();
        s.admit(Arrival::new(1, UrgencyLevel::Standard, now)); // room 0
        s.admit(Arrival::new(2, UrgencyLevel::Critical, now)); // room 1
        let work = s.acquire(0).unwrap();
        assert_eq!(work.entry.patient_id(), 1);
        assert!(work.stolen_from.is_none());
    }

    #[test]
    fn idle_room_steals() {
        let s = scheduler(2, 1);
        s.admit(Arrival::new(1, UrgencyLevel::Critical, Utc::now())); // room 0
        let work = s.acquire(1).unwrap();
        assert_eq!(work.stolen_from, Some((0, StealTier::BorrowCritical)));

        let doctor = DoctorKey::new(1, 1);
        s.serve(doctor, work).unwrap();
        let record = s.log().get(1).unwrap();
        assert_eq!(record.state(), PatientState::Completed);
        assert_eq!(record.room, Some(1));
        assert_eq!(record.doctor, Some(doctor));
        assert_eq!(s.occupancy().busy_count(), 0);
    }

    #[test]
    fn sweep_skips_patients_already_dequeued() {
        let s = scheduler(1, 1);
        let long_ago = Utc::now() - ChronoDuration::minutes(5);
        s.admit(Arrival::new(1, UrgencyLevel::Urgent, long_ago));
        s.admit(Arrival::new(2, UrgencyLevel::Urgent, long_ago));

        let taken = s.acquire(0).unwrap();
        assert_eq!(s.sweep_room(0, Utc::now()), 1);
        s.serve(DoctorKey::new(0, 1), taken).unwrap();

        assert_eq!(s.log().get(1).unwrap().state(), PatientState::Completed);
        assert_eq!(s.log().get(2).unwrap().state(), PatientState::Abandoned);
        assert_eq!(s.sweep_room(0, Utc::now()), 0);
    }

    #[test]
    fn acquire_returns_none_after_shutdown() {
        let s = scheduler(1, 1);
        s.request_shutdown();
        assert!(s.acquire(0).is_none());
    }
}
