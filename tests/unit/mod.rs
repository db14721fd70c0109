//! Unit tests for individual components

mod config_test;
mod error_test;
mod protocol_test;
mod util_test;
