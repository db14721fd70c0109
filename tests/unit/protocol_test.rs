//! Tests for the arrival wire message

use triage_engine::core::TriageError;
use triage_engine::runtime::protocol::MAX_MESSAGE_BYTES;
use triage_engine::runtime::{ArrivalMessage, ACKNOWLEDGMENT};
use triage_engine::util::UrgencyLevel;

#[test]
fn test_acknowledgment_literal() {
    assert_eq!(ACKNOWLEDGMENT, b"CHEGADA_RECEBIDA");
    assert!(MAX_MESSAGE_BYTES >= 1024);
}

#[test]
fn test_decode_with_trailing_newline() {
    let raw = b"{\"pid\": 9, \"timestamp\": \"2024-05-01T10:00:00Z\", \"urgencia\": \"verde\"}\n";
    let arrival = ArrivalMessage::decode(raw).unwrap().into_arrival();
    assert_eq!(arrival.patient_id, 9);
    assert_eq!(arrival.level, UrgencyLevel::Standard);
}

#[test]
fn test_missing_field_is_malformed() {
    let raw = br#"{"pid": 9, "urgencia": "verde"}"#;
    assert!(matches!(
        ArrivalMessage::decode(raw),
        Err(TriageError::MalformedArrival(_))
    ));
}
