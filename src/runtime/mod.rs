//! Network surface: arrival protocol and the TCP admission server.

pub mod protocol;
#[cfg(feature = "tokio-runtime")]
pub mod server;

pub use protocol::{ArrivalMessage, ACKNOWLEDGMENT};
#[cfg(feature = "tokio-runtime")]
pub use server::AdmissionServer;
