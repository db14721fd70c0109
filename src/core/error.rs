//! Error types for triage engine operations.

use thiserror::Error;

use crate::util::serde::PatientId;

/// Errors produced by engine components.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Arrival payload could not be decoded.
    #[error("malformed arrival: {0}")]
    MalformedArrival(String),
    /// No record exists for the patient.
    #[error("unknown patient {0}")]
    UnknownPatient(PatientId),
    /// The patient's record is already terminal.
    #[error("patient {0} already has a terminal record")]
    TerminalRecord(PatientId),
    /// The requested lifecycle transition does not apply to the record's state.
    #[error("patient {patient_id}: cannot {action} a record that is {state}")]
    InvalidTransition {
        /// Patient whose record was targeted.
        patient_id: PatientId,
        /// Attempted transition.
        action: &'static str,
        /// State the record was in.
        state: &'static str,
    },
    /// Listener could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Underlying I/O failure.
        source: std::io::Error,
    },
    /// Filesystem or socket failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Snapshot (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
