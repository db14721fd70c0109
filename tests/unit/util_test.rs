//! Tests for utility functions

use chrono::{Duration, TimeZone, Utc};
use triage_engine::util::{parse_instant, seconds_between, DoctorKey, UrgencyLevel, UNKNOWN_RANK};

#[test]
fn test_urgency_ranks() {
    assert_eq!(UrgencyLevel::Critical.rank(), 0);
    assert_eq!(UrgencyLevel::Urgent.rank(), 1);
    assert_eq!(UrgencyLevel::Standard.rank(), 2);
    assert_eq!(UrgencyLevel::from_wire("laranja").rank(), UNKNOWN_RANK);
}

#[test]
fn test_urgency_wire_names() {
    assert_eq!(UrgencyLevel::from_wire(" Vermelho "), UrgencyLevel::Critical);
    assert_eq!(UrgencyLevel::Urgent.as_str(), "amarelo");
    let unknown = UrgencyLevel::from_wire("azul");
    assert!(!unknown.is_recognized());
    assert_eq!(unknown.to_string(), "azul");
}

#[test]
fn test_urgency_recorded_spelling() {
    let level = UrgencyLevel::from_wire("Vermelho");
    assert_eq!(serde_json::to_string(&level).unwrap(), "\"vermelho\"");
    let level: UrgencyLevel = serde_json::from_str("\" AMARELO\"").unwrap();
    assert_eq!(serde_json::to_string(&level).unwrap(), "\"amarelo\"");
    let unknown = UrgencyLevel::from_wire("Roxo");
    assert_eq!(serde_json::to_string(&unknown).unwrap(), "\"Roxo\"");
}

#[test]
fn test_doctor_key_string_form() {
    let key = DoctorKey::new(2, 1);
    assert_eq!(key.to_string(), "2-1");
    assert_eq!("2-1".parse::<DoctorKey>().unwrap(), key);
    assert!("2".parse::<DoctorKey>().is_err());
    assert_eq!(serde_json::to_string(&key).unwrap(), "\"2-1\"");
}

#[test]
fn test_seconds_between_clamps() {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let t1 = t0 + Duration::milliseconds(1_500);
    assert!((seconds_between(t0, t1) - 1.5).abs() < 1e-9);
    assert!(seconds_between(t1, t0).abs() < f64::EPSILON);
}

#[test]
fn test_parse_instant_formats() {
    let zoned = parse_instant("2024-05-01T10:00:00.250Z").unwrap();
    let naive = parse_instant("2024-05-01T10:00:00.250").unwrap();
    assert_eq!(zoned, naive);
    assert!(parse_instant("yesterday").is_err());
}
