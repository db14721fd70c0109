//! Arrival wire message: one JSON object per connection.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::core::patient::Arrival;
use crate::core::TriageError;
use crate::util::clock::deserialize_instant;
use crate::util::serde::{PatientId, UrgencyLevel};

/// Literal reply sent after a successful admission.
pub const ACKNOWLEDGMENT: &[u8] = b"CHEGADA_RECEBIDA";

/// Largest message read from a connection.
pub const MAX_MESSAGE_BYTES: usize = 4096;

/// Decoded arrival message.
///
/// Unknown fields (such as the `room` hint sent by the multi-room simulator)
/// are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArrivalMessage {
    /// Patient identifier.
    #[serde(rename = "pid", alias = "patient_id")]
    pub patient_id: PatientId,
    /// Urgency level; the legacy accented key is accepted too.
    #[serde(rename = "urgencia", alias = "urgência", alias = "urgency_level")]
    pub level: UrgencyLevel,
    /// Client-side arrival instant.
    #[serde(deserialize_with = "deserialize_instant")]
    pub timestamp: DateTime<Utc>,
}

impl ArrivalMessage {
    /// Decode a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::MalformedArrival` for empty, non-UTF-8 or
    /// non-conforming payloads.
    pub fn decode(raw: &[u8]) -> Result<Self, TriageError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| TriageError::MalformedArrival(format!("not utf-8: {e}")))?;
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if text.is_empty() {
            return Err(TriageError::MalformedArrival("empty payload".into()));
        }
        serde_json::from_str(text).map_err(|e| TriageError::MalformedArrival(e.to_string()))
    }

    /// Convert into the engine's arrival record.
    #[must_use]
    pub fn into_arrival(self) -> Arrival {
        Arrival::new(self.patient_id, self.level, self.timestamp)
    }
}
