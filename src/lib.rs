//! # Triage Engine
//!
//! Admission and scheduling engine for an emergency-room triage pipeline.
//!
//! Patients arrive over TCP, are classified by urgency, queued in one of
//! several rooms, and served by a fixed pool of doctor threads per room. A
//! doctor whose room is empty borrows work from peer rooms, and a per-room
//! sweeper evicts patients who waited longer than their level allows.
//!
//! ## Components
//!
//! - **Event Log** ([`core::EventLog`]): one record per patient, mutated in place
//!   across its lifecycle under a single writer lock, optionally exported as a
//!   JSON snapshot after every write
//! - **Occupancy Registry** ([`core::OccupancyRegistry`]): which doctors are busy, and where
//! - **Room** ([`core::Room`]): urgency-ordered queue plus its lock/condition pair
//! - **Stealing** ([`core::stealing`]): borrow-critical first, then global steal,
//!   never holding two room locks at once
//! - **Scheduler** ([`core::Scheduler`]): owns the rooms; admission, acquire/serve, sweeps
//! - **Admission Server** ([`runtime::AdmissionServer`]): tokio TCP ingress
//!
//! ## Example
//!
//! ```rust,ignore
//! use triage_engine::builders::start_engine;
//! use triage_engine::config::EngineConfig;
//! use triage_engine::core::Arrival;
//! use triage_engine::util::UrgencyLevel;
//!
//! let engine = start_engine(&EngineConfig::in_memory(3, 2))?;
//! let room = engine
//!     .scheduler()
//!     .admit(Arrival::new(1, UrgencyLevel::Critical, chrono::Utc::now()));
//! println!("queued in room {room}");
//! engine.shutdown();
//! ```
//!
//! For complete scenarios, see `tests/scheduler_test.rs` and `tests/admission_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling: rooms, stealing, abandonment, event log and occupancy.
pub mod core;
/// Configuration models for the engine and urgency profiles.
pub mod config;
/// Builders to construct the engine from configuration.
pub mod builders;
/// Infrastructure adapters for queues and snapshot files.
pub mod infra;
/// Arrival protocol and the TCP admission server.
pub mod runtime;
/// Shared utilities.
pub mod util;
