//! Tests for error types

use triage_engine::core::{AppResult, TriageError};

#[test]
fn test_error_display() {
    let err = TriageError::UnknownPatient(42);
    assert_eq!(err.to_string(), "unknown patient 42");

    let err = TriageError::TerminalRecord(7);
    assert!(err.to_string().contains("terminal"));

    let err = TriageError::InvalidTransition {
        patient_id: 3,
        action: "start",
        state: "in service",
    };
    assert_eq!(
        err.to_string(),
        "patient 3: cannot start a record that is in service"
    );
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: TriageError = io.into();
    assert!(matches!(err, TriageError::Io(_)));
}

#[test]
fn test_serialization_error_conversion() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: TriageError = json_err.into();
    assert!(err.to_string().starts_with("serialization error"));
}

#[test]
fn test_app_result_wraps_triage_error() {
    fn fails() -> AppResult<()> {
        Err(TriageError::MalformedArrival("empty payload".into()))?;
        Ok(())
    }
    let err = fails().unwrap_err();
    assert!(err.downcast_ref::<TriageError>().is_some());
    assert_eq!(err.to_string(), "malformed arrival: empty payload");
}
