//! Builders to construct engine components from configuration.

pub mod engine_builder;

pub use engine_builder::build_scheduler;
#[cfg(not(target_arch = "wasm32"))]
pub use engine_builder::start_engine;
