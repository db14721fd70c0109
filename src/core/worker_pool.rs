//! Doctor and sweeper threads.
//!
//! Every doctor is a dedicated OS thread running the acquire/serve loop of its
//! room; every room also gets one sweeper thread driven by a fixed ticker.
//!
//! # Design Principles
//!
//! - **Blocking waits only**: doctors park on their room's condvar with a bounded
//!   timeout, sweepers block on a ticker
//! - **Clean shutdown**: dropping the stop sender unblocks every sweeper; the
//!   shutdown flag plus a broadcast wakes every idle doctor

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use tracing::{debug, info, warn};

use crate::core::scheduler::Scheduler;
use crate::core::TriageError;
use crate::util::clock;
use crate::util::serde::{DoctorKey, RoomId};

/// Running engine threads.
pub struct EngineHandle {
    scheduler: Arc<Scheduler>,
    workers: Vec<JoinHandle<()>>,
    /// Dropping this sender stops every sweeper.
    sweep_stop: Option<Sender<()>>,
}

impl EngineHandle {
    /// Spawn `doctor_count` doctors and one sweeper per room.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::Io` if a thread cannot be spawned; threads already
    /// started are told to stop.
    pub fn start(scheduler: Arc<Scheduler>, sweep_interval: Duration) -> Result<Self, TriageError> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let mut handle = Self {
            scheduler: Arc::clone(&scheduler),
            workers: Vec::new(),
            sweep_stop: Some(stop_tx),
        };

        for room in scheduler.rooms() {
            for doctor in 1..=room.doctor_count() {
                let key = DoctorKey::new(room.id(), doctor);
                handle.workers.push(spawn_doctor(Arc::clone(&scheduler), key)?);
            }
            handle.workers.push(spawn_sweeper(
                Arc::clone(&scheduler),
                room.id(),
                sweep_interval,
                stop_rx.clone(),
            )?);
        }

        info!(
            rooms = scheduler.rooms().len(),
            threads = handle.workers.len(),
            "engine threads started"
        );
        Ok(handle)
    }

    /// The scheduler these threads drive.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Stop all threads and wait for them. In-progress services finish first.
    pub fn shutdown(mut self) {
        self.signal_stop();
        let count = self.workers.len();
        for worker in self.workers.drain(..) {
            let name = worker.thread().name().map(str::to_owned);
            if worker.join().is_err() {
                warn!(thread = ?name, "engine thread panicked");
            }
        }
        info!(threads = count, "engine shut down");
    }

    fn signal_stop(&mut self) {
        self.scheduler.request_shutdown();
        self.sweep_stop = None;
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        // Signal but don't join: threads may be mid-service.
        if self.sweep_stop.is_some() {
            self.signal_stop();
            debug!("EngineHandle dropped without explicit shutdown - threads detached");
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("threads", &self.workers.len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

fn spawn_doctor(scheduler: Arc<Scheduler>, doctor: DoctorKey) -> Result<JoinHandle<()>, TriageError> {
    let handle = thread::Builder::new()
        .name(format!("room{}-doctor{}", doctor.room, doctor.doctor))
        .spawn(move || {
            debug!(doctor = %doctor, "doctor on duty");
            while let Some(work) = scheduler.acquire(doctor.room) {
                scheduler.serve(doctor, work);
            }
            debug!(doctor = %doctor, "doctor off duty");
        })?;
    Ok(handle)
}

fn spawn_sweeper(
    scheduler: Arc<Scheduler>,
    room: RoomId,
    interval: Duration,
    stop: Receiver<()>,
) -> Result<JoinHandle<()>, TriageError> {
    let handle = thread::Builder::new()
        .name(format!("room{room}-sweeper"))
        .spawn(move || {
            let ticker = tick(interval);
            loop {
                select! {
                    recv(ticker) -> _ => {
                        let evicted = scheduler.sweep_room(room, clock::now());
                        if evicted > 0 {
                            debug!(room, evicted, "sweep evicted patients");
                        }
                    }
                    recv(stop) -> _ => break,
                }
            }
            debug!(room, "sweeper stopped");
        })?;
    Ok(handle)
}
