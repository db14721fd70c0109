//! Infrastructure adapters: queue backend and JSON snapshot files.

pub mod queue;
pub mod snapshot;

pub use queue::TriageQueue;
pub use snapshot::JsonSnapshotFile;
