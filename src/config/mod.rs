//! Configuration models for the engine, rooms and urgency profiles.

pub mod engine;

pub use engine::{EngineConfig, LevelTable, UrgencyProfile};
