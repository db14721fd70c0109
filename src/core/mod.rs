//! Core triage engine: rooms, scheduling, stealing, abandonment and shared state.

pub mod error;
pub mod event_log;
pub mod occupancy;
pub mod patient;
pub mod room;
pub mod scheduler;
pub mod stealing;
#[cfg(not(target_arch = "wasm32"))]
pub mod worker_pool;

pub use error::{AppResult, TriageError};
pub use event_log::{EventLog, LogSnapshot, LogSummary, PatientRecord, PatientState};
pub use occupancy::{OccupancyEntry, OccupancyRegistry};
pub use patient::{Arrival, QueueEntry, QueueKey};
pub use room::Room;
pub use scheduler::{Acquired, Scheduler, ServiceOutcome};
pub use stealing::{steal, StealTier, Stolen};
#[cfg(not(target_arch = "wasm32"))]
pub use worker_pool::EngineHandle;
