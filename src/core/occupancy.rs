//! Occupancy Registry: which doctors are busy, and where.

use std::collections::BTreeMap;
use std::path::Path;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::infra::snapshot::JsonSnapshotFile;
use crate::util::serde::{DoctorKey, RoomId};

/// Occupancy of one doctor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyEntry {
    /// Room the doctor is serving in; `None` while free.
    pub room: Option<RoomId>,
    /// Whether the doctor is serving a patient.
    #[serde(rename = "ocupado")]
    pub occupied: bool,
}

impl OccupancyEntry {
    /// A free doctor.
    pub const FREE: Self = Self {
        room: None,
        occupied: false,
    };
}

/// Shared registry of doctor occupancy, written by workers on every transition.
///
/// Writes are serialized by their own lock, independently of the Event Log.
pub struct OccupancyRegistry {
    entries: Mutex<BTreeMap<DoctorKey, OccupancyEntry>>,
    file: Option<JsonSnapshotFile>,
}

impl OccupancyRegistry {
    /// Registry with every doctor of every room marked free.
    #[must_use]
    pub fn new(rooms: usize, doctors_per_room: usize) -> Self {
        let entries = (0..rooms)
            .flat_map(|room| (1..=doctors_per_room).map(move |doctor| DoctorKey::new(room, doctor)))
            .map(|key| (key, OccupancyEntry::FREE))
            .collect();
        Self {
            entries: Mutex::new(entries),
            file: None,
        }
    }

    /// Registry exported to `path`. Any previous file is overwritten with the
    /// all-free initial state.
    #[must_use]
    pub fn with_file(rooms: usize, doctors_per_room: usize, path: impl AsRef<Path>) -> Self {
        let mut registry = Self::new(rooms, doctors_per_room);
        registry.file = Some(JsonSnapshotFile::new(path));
        registry.export(&registry.entries.lock());
        registry
    }

    fn export(&self, entries: &BTreeMap<DoctorKey, OccupancyEntry>) {
        if let Some(file) = &self.file {
            if let Err(e) = file.store(entries) {
                error!(path = %file.path().display(), error = %e, "failed to persist occupancy");
            }
        }
    }

    fn set(&self, doctor: DoctorKey, entry: OccupancyEntry) {
        let mut entries = self.entries.lock();
        entries.insert(doctor, entry);
        self.export(&entries);
    }

    /// Mark a doctor busy in `room`.
    pub fn mark_busy(&self, doctor: DoctorKey, room: RoomId) {
        self.set(
            doctor,
            OccupancyEntry {
                room: Some(room),
                occupied: true,
            },
        );
    }

    /// Mark a doctor free.
    pub fn mark_free(&self, doctor: DoctorKey) {
        self.set(doctor, OccupancyEntry::FREE);
    }

    /// Occupancy of one doctor.
    #[must_use]
    pub fn get(&self, doctor: DoctorKey) -> Option<OccupancyEntry> {
        self.entries.lock().get(&doctor).copied()
    }

    /// Copy of every entry.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<DoctorKey, OccupancyEntry> {
        self.entries.lock().clone()
    }

    /// Number of doctors currently busy.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.entries.lock().values().filter(|e| e.occupied).count()
    }
}

impl std::fmt::Debug for OccupancyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (doctors, busy) = {
            let entries = self.entries.lock();
            (entries.len(), entries.values().filter(|e| e.occupied).count())
        };
        f.debug_struct("OccupancyRegistry")
            .field("doctors", &doctors)
            .field("busy", &busy)
            .finish()
    }
}
