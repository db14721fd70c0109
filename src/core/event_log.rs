//! Event Log: one mutable record per patient, serialized through a single writer lock.
//!
//! The in-memory store is authoritative. When a snapshot file is attached, the
//! full document is re-exported after every mutation while the writer lock is
//! still held, so the file always reflects a complete, ordered history of writes.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::core::patient::Arrival;
use crate::core::TriageError;
use crate::infra::snapshot::JsonSnapshotFile;
use crate::util::clock::{deserialize_instant, deserialize_optional_instant, seconds_between};
use crate::util::serde::{DoctorKey, PatientId, RoomId, UrgencyLevel};

/// Lifecycle position of a patient record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatientState {
    /// Admitted and queued; no service fields set.
    Waiting,
    /// A doctor has started service.
    InService,
    /// Service finished. Terminal.
    Completed,
    /// Left the queue before service. Terminal.
    Abandoned,
}

impl PatientState {
    /// Whether no further mutation is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InService => "in service",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// The persisted lifecycle record of one patient.
///
/// Field names on the wire follow the established log format read by the
/// dashboard (`pid`, `medico`, `chegada`, ...).
///
/// Decoding also accepts the shapes older servers wrote: a bare doctor number
/// in `medico` (scoped to the record's `room`), a null `nivel`, and timestamps
/// without an offset. Bare doctor numbers are written back as `"<room>-<doctor>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct PatientRecord {
    /// Patient identifier.
    #[serde(rename = "pid")]
    pub patient_id: PatientId,
    /// Doctor that served (or is serving) the patient.
    #[serde(rename = "medico")]
    pub doctor: Option<DoctorKey>,
    /// Room that served or evicted the patient.
    pub room: Option<RoomId>,
    /// Arrival instant.
    #[serde(rename = "chegada")]
    pub arrived_at: DateTime<Utc>,
    /// Urgency level. A missing level is held as an empty unrecognised level
    /// and written back as `null`.
    #[serde(rename = "nivel", serialize_with = "serialize_stored_level")]
    pub level: UrgencyLevel,
    /// Service start; `None` until a doctor picks the patient up.
    #[serde(rename = "inicio")]
    pub service_start: Option<DateTime<Utc>>,
    /// Service end, or eviction time for abandonments.
    #[serde(rename = "saida")]
    pub service_end: Option<DateTime<Utc>>,
    /// Seconds spent queued.
    #[serde(rename = "espera")]
    pub waited_secs: Option<f64>,
    /// Seconds spent in service.
    #[serde(rename = "duracao")]
    pub service_secs: Option<f64>,
    /// Whether the patient abandoned. Absent reads as `false`.
    #[serde(rename = "desistencia", default)]
    pub abandoned: bool,
    /// Burst index stamped by load-generation tooling.
    #[serde(rename = "surto", default, skip_serializing_if = "Option::is_none")]
    pub burst: Option<u32>,
}

impl PatientRecord {
    /// Fresh record for an arrival: every service field unset.
    #[must_use]
    pub fn arrived(arrival: &Arrival) -> Self {
        Self {
            patient_id: arrival.patient_id,
            doctor: None,
            room: None,
            arrived_at: arrival.arrived_at,
            level: arrival.level.clone(),
            service_start: None,
            service_end: None,
            waited_secs: None,
            service_secs: None,
            abandoned: false,
            burst: None,
        }
    }

    /// Lifecycle position derived from the nullable fields.
    #[must_use]
    pub const fn state(&self) -> PatientState {
        if self.abandoned {
            PatientState::Abandoned
        } else if self.service_end.is_some() {
            PatientState::Completed
        } else if self.service_start.is_some() {
            PatientState::InService
        } else {
            PatientState::Waiting
        }
    }
}

fn serialize_stored_level<S: Serializer>(level: &UrgencyLevel, serializer: S) -> Result<S::Ok, S::Error> {
    match level {
        UrgencyLevel::Unrecognized(raw) if raw.is_empty() => serializer.serialize_none(),
        level => level.serialize(serializer),
    }
}

/// On-disk record shape, before legacy fields are resolved.
#[derive(Deserialize)]
struct StoredRecord {
    pid: PatientId,
    #[serde(default)]
    medico: Option<Value>,
    #[serde(default)]
    room: Option<RoomId>,
    #[serde(deserialize_with = "deserialize_instant")]
    chegada: DateTime<Utc>,
    #[serde(default)]
    nivel: Option<UrgencyLevel>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    inicio: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_instant")]
    saida: Option<DateTime<Utc>>,
    #[serde(default)]
    espera: Option<f64>,
    #[serde(default)]
    duracao: Option<f64>,
    #[serde(default)]
    desistencia: bool,
    #[serde(default)]
    surto: Option<u32>,
}

fn stored_doctor(medico: Option<Value>, room: Option<RoomId>) -> Result<Option<DoctorKey>, String> {
    let bare = |doctor: usize| {
        room.map(|room| DoctorKey::new(room, doctor))
            .ok_or_else(|| format!("doctor `{doctor}` has no room to scope it"))
    };
    match medico {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => match text.parse::<usize>() {
            Ok(doctor) => bare(doctor).map(Some),
            Err(_) => text.parse::<DoctorKey>().map(Some),
        },
        Some(Value::Number(n)) => {
            let doctor = n
                .as_u64()
                .and_then(|d| usize::try_from(d).ok())
                .ok_or_else(|| format!("doctor `{n}` is not a doctor number"))?;
            bare(doctor).map(Some)
        }
        Some(other) => Err(format!("unsupported doctor value `{other}`")),
    }
}

impl TryFrom<StoredRecord> for PatientRecord {
    type Error = String;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            patient_id: stored.pid,
            doctor: stored_doctor(stored.medico, stored.room)?,
            room: stored.room,
            arrived_at: stored.chegada,
            level: stored
                .nivel
                .unwrap_or_else(|| UrgencyLevel::Unrecognized(String::new())),
            service_start: stored.inicio,
            service_end: stored.saida,
            waited_secs: stored.espera,
            service_secs: stored.duracao,
            abandoned: stored.desistencia,
            burst: stored.surto,
        })
    }
}

/// Full Event Log document: patient records keyed by id plus the non-patient
/// scalar keys (`medicos_totais`, `salas_totais`, `total_surtos`, ...) that
/// tooling may have stored alongside them.
///
/// The document is read once at startup. Edits other processes make to the
/// file while the engine runs (such as `surto` marks stamped by the burst
/// simulator) are not merged and are overwritten by the next export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogSnapshot {
    /// Records keyed by patient id.
    pub records: BTreeMap<PatientId, PatientRecord>,
    /// Top-level keys that are not digit strings, preserved verbatim.
    pub extras: Map<String, Value>,
    /// Digit-keyed entries that could not be decoded as records, preserved
    /// verbatim until a new arrival reuses the id.
    pub unparsed: Map<String, Value>,
}

fn is_patient_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

impl LogSnapshot {
    /// Split a raw JSON object into records, extras and undecodable entries.
    ///
    /// An entry that fails to decode is kept aside with a warning rather than
    /// discarding it or the whole document.
    #[must_use]
    pub fn from_document(document: Map<String, Value>) -> Self {
        let mut snapshot = Self::default();
        for (key, value) in document {
            if !is_patient_key(&key) {
                snapshot.extras.insert(key, value);
                continue;
            }
            let Ok(pid) = key.parse::<PatientId>() else {
                warn!(key = %key, "keeping log entry with out-of-range patient id as is");
                snapshot.unparsed.insert(key, value);
                continue;
            };
            match PatientRecord::deserialize(&value) {
                Ok(record) => {
                    snapshot.records.insert(pid, record);
                }
                Err(e) => {
                    warn!(patient_id = pid, error = %e, "keeping undecodable log record as is");
                    snapshot.unparsed.insert(key, value);
                }
            }
        }
        snapshot
    }

    /// Simple counts over the patient records.
    #[must_use]
    pub fn summary(&self) -> LogSummary {
        let mut summary = LogSummary::default();
        for record in self.records.values() {
            summary.total += 1;
            match record.state() {
                PatientState::Waiting => summary.waiting += 1,
                PatientState::InService => summary.in_service += 1,
                PatientState::Completed => summary.served += 1,
                PatientState::Abandoned => summary.abandoned += 1,
            }
        }
        summary
    }
}

impl Serialize for LogSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.records.len() + self.extras.len() + self.unparsed.len();
        let mut map = serializer.serialize_map(Some(len))?;
        for (key, value) in self.extras.iter().chain(&self.unparsed) {
            map.serialize_entry(key, value)?;
        }
        for (pid, record) in &self.records {
            map.serialize_entry(&pid.to_string(), record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for LogSnapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Map::<String, Value>::deserialize(deserializer)?;
        Ok(Self::from_document(document))
    }
}

/// Counts of patients per lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    /// Completed service.
    #[serde(rename = "atendidos")]
    pub served: usize,
    /// Abandoned the queue.
    #[serde(rename = "desistencias")]
    pub abandoned: usize,
    /// Still queued.
    #[serde(rename = "esperando")]
    pub waiting: usize,
    /// Currently with a doctor.
    #[serde(rename = "em_atendimento")]
    pub in_service: usize,
    /// All patient records.
    pub total: usize,
}

/// Shared lifecycle log of every patient.
pub struct EventLog {
    /// Single writer lock spanning every read-modify-write and its export.
    state: Mutex<LogSnapshot>,
    file: Option<JsonSnapshotFile>,
}

impl EventLog {
    /// Log kept in memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(LogSnapshot::default()),
            file: None,
        }
    }

    /// Log exported to `path` after every write.
    ///
    /// An existing document is loaded first; a missing or unreadable file is
    /// treated as an empty log.
    pub fn with_file(path: impl AsRef<Path>) -> Self {
        let file = JsonSnapshotFile::new(path);
        let snapshot = match file.load::<LogSnapshot>() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => LogSnapshot::default(),
            Err(e) => {
                warn!(path = %file.path().display(), error = %e, "event log unreadable, starting empty");
                LogSnapshot::default()
            }
        };
        Self {
            state: Mutex::new(snapshot),
            file: Some(file),
        }
    }

    /// Persist the current document. Failures are logged; memory stays authoritative.
    fn export(&self, snapshot: &LogSnapshot) {
        if let Some(file) = &self.file {
            if let Err(e) = file.store(snapshot) {
                error!(path = %file.path().display(), error = %e, "failed to persist event log");
            }
        }
    }

    /// Insert the arrival record for a newly admitted patient.
    ///
    /// An earlier record under the same id is replaced: a repeated id starts a
    /// new lifecycle.
    pub fn record_arrival(&self, arrival: &Arrival) -> PatientRecord {
        let record = PatientRecord::arrived(arrival);
        let mut state = self.state.lock();
        if state.unparsed.remove(&arrival.patient_id.to_string()).is_some() {
            warn!(patient_id = arrival.patient_id, "patient id reused; undecodable record replaced");
        }
        if let Some(previous) = state.records.insert(arrival.patient_id, record.clone()) {
            warn!(
                patient_id = arrival.patient_id,
                previous_state = previous.state().label(),
                "patient id reused; previous record replaced"
            );
        }
        self.export(&state);
        record
    }

    fn transition<F>(
        &self,
        patient_id: PatientId,
        action: &'static str,
        from: PatientState,
        apply: F,
    ) -> Result<PatientRecord, TriageError>
    where
        F: FnOnce(&mut PatientRecord),
    {
        let mut state = self.state.lock();
        let record = state
            .records
            .get_mut(&patient_id)
            .ok_or(TriageError::UnknownPatient(patient_id))?;
        let current = record.state();
        if current.is_terminal() {
            return Err(TriageError::TerminalRecord(patient_id));
        }
        if current != from {
            return Err(TriageError::InvalidTransition {
                patient_id,
                action,
                state: current.label(),
            });
        }
        apply(record);
        let updated = record.clone();
        self.export(&state);
        Ok(updated)
    }

    /// Mark a waiting patient as in service.
    pub fn start_service(
        &self,
        patient_id: PatientId,
        doctor: DoctorKey,
        room: RoomId,
        started_at: DateTime<Utc>,
    ) -> Result<PatientRecord, TriageError> {
        self.transition(patient_id, "start service for", PatientState::Waiting, |record| {
            record.doctor = Some(doctor);
            record.room = Some(room);
            record.service_start = Some(started_at);
            record.waited_secs = Some(seconds_between(record.arrived_at, started_at));
        })
    }

    /// Mark an in-service patient as completed.
    pub fn complete_service(
        &self,
        patient_id: PatientId,
        ended_at: DateTime<Utc>,
    ) -> Result<PatientRecord, TriageError> {
        self.transition(patient_id, "complete", PatientState::InService, |record| {
            let started = record.service_start.unwrap_or(ended_at);
            record.service_end = Some(ended_at);
            record.service_secs = Some(seconds_between(started, ended_at));
        })
    }

    /// Mark a waiting patient as abandoned at `at`.
    pub fn abandon(
        &self,
        patient_id: PatientId,
        room: RoomId,
        at: DateTime<Utc>,
        waited_secs: f64,
    ) -> Result<PatientRecord, TriageError> {
        self.transition(patient_id, "abandon", PatientState::Waiting, |record| {
            record.room = Some(room);
            record.service_start = None;
            record.service_end = Some(at);
            record.waited_secs = Some(waited_secs);
            record.abandoned = true;
        })
    }

    /// Current record of a patient.
    #[must_use]
    pub fn get(&self, patient_id: PatientId) -> Option<PatientRecord> {
        self.state.lock().records.get(&patient_id).cloned()
    }

    /// Copy of the whole document.
    #[must_use]
    pub fn snapshot(&self) -> LogSnapshot {
        self.state.lock().clone()
    }

    /// Counts per lifecycle state.
    #[must_use]
    pub fn summary(&self) -> LogSummary {
        self.state.lock().summary()
    }

    /// Number of patient records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Whether the log holds no patient records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog")
            .field("records", &self.len())
            .field("file", &self.file.as_ref().map(JsonSnapshotFile::path))
            .finish()
    }
}
