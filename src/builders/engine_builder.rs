//! Builders to construct the engine from configuration.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{EventLog, OccupancyRegistry, Scheduler, TriageError};

/// Build the event log, occupancy registry and scheduler described by `cfg`.
///
/// File-backed stores are used when paths are configured; the occupancy file
/// is reset to all-free and an existing event log is loaded.
///
/// # Errors
///
/// Returns `TriageError::InvalidConfig` if the configuration is invalid.
pub fn build_scheduler(cfg: &EngineConfig) -> Result<Arc<Scheduler>, TriageError> {
    cfg.validate().map_err(TriageError::InvalidConfig)?;

    let log = cfg
        .log_path
        .as_ref()
        .map_or_else(EventLog::in_memory, |path| EventLog::with_file(path));
    let occupancy = cfg.occupancy_path.as_ref().map_or_else(
        || OccupancyRegistry::new(cfg.rooms, cfg.doctors_per_room),
        |path| OccupancyRegistry::with_file(cfg.rooms, cfg.doctors_per_room, path),
    );

    let scheduler = Scheduler::new(cfg, Arc::new(log), Arc::new(occupancy))?;
    Ok(Arc::new(scheduler))
}

/// Build the scheduler and start its doctor and sweeper threads.
///
/// # Errors
///
/// Returns `TriageError::InvalidConfig` for an invalid configuration and
/// `TriageError::Io` if threads cannot be spawned.
#[cfg(not(target_arch = "wasm32"))]
pub fn start_engine(cfg: &EngineConfig) -> Result<crate::core::EngineHandle, TriageError> {
    let scheduler = build_scheduler(cfg)?;
    crate::core::EngineHandle::start(scheduler, cfg.sweep_interval())
}
