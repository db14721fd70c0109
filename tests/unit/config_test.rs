//! Tests for configuration validation

use std::time::Duration;

use triage_engine::config::{EngineConfig, LevelTable, UrgencyProfile};
use triage_engine::util::UrgencyLevel;

#[test]
fn test_default_config() {
    let cfg = EngineConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.listen_addr(), "127.0.0.1:9000");
    assert_eq!(cfg.rooms, 3);
    assert_eq!(cfg.doctors_per_room, 1);
    assert!(cfg.log_path.is_some());
    assert!(cfg.occupancy_path.is_some());
}

#[test]
fn test_in_memory_config_has_no_files() {
    let cfg = EngineConfig::in_memory(4, 2);
    assert!(cfg.log_path.is_none());
    assert!(cfg.occupancy_path.is_none());
    assert_eq!(cfg.rooms, 4);
    assert_eq!(cfg.doctors_per_room, 2);
}

#[test]
fn test_zero_rooms_rejected() {
    assert!(EngineConfig::in_memory(0, 1).validate().is_err());
}

#[test]
fn test_zero_doctors_rejected() {
    assert!(EngineConfig::in_memory(1, 0).validate().is_err());
}

#[test]
fn test_zero_sweep_interval_rejected() {
    let cfg = EngineConfig::in_memory(1, 1).with_sweep_interval(Duration::ZERO);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_level_ordering_defaults() {
    let table = LevelTable::default();
    assert!(table.vermelho.abandon_timeout() > table.amarelo.abandon_timeout());
    assert!(table.amarelo.abandon_timeout() > table.verde.abandon_timeout());
    assert_eq!(
        table.profile(&UrgencyLevel::from_wire("roxo")),
        table.profile(&UrgencyLevel::Standard)
    );
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "port": 9100,
        "rooms": 2,
        "doctors_per_room": 3,
        "log_path": null,
        "levels": {
            "vermelho": { "service_ms": 100, "abandon_timeout_ms": 1000 },
            "amarelo": { "service_ms": 50, "abandon_timeout_ms": 500 },
            "verde": { "service_ms": 10, "abandon_timeout_ms": 100 }
        }
    }"#;
    let cfg = EngineConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.port, 9100);
    assert_eq!(cfg.rooms, 2);
    assert_eq!(cfg.doctors_per_room, 3);
    assert!(cfg.log_path.is_none());
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.levels.verde, UrgencyProfile::from_millis(10, 100));
}

#[test]
fn test_config_from_json_rejects_invalid() {
    assert!(EngineConfig::from_json_str(r#"{"rooms": 0}"#).is_err());
    assert!(EngineConfig::from_json_str("not json").is_err());
}
