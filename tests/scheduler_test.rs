//! End-to-end scheduling scenarios with running doctor and sweeper threads.
//!
//! Durations are scaled down to milliseconds; one "time unit" is 20ms here.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use triage_engine::builders::{build_scheduler, start_engine};
use triage_engine::config::{EngineConfig, LevelTable, UrgencyProfile};
use triage_engine::core::{Arrival, EngineHandle, PatientState, Scheduler};
use triage_engine::util::{RoomId, UrgencyLevel};

// ============================================================================
// HELPERS
// ============================================================================

const UNIT_MS: u64 = 20;

fn config(rooms: usize, doctors: usize, levels: LevelTable) -> EngineConfig {
    EngineConfig::in_memory(rooms, doctors)
        .with_levels(levels)
        .with_sweep_interval(Duration::from_millis(UNIT_MS))
        .with_steal_poll_interval(Duration::from_millis(5))
}

fn uniform(service_units: u64, timeout_units: u64) -> LevelTable {
    LevelTable::uniform(UrgencyProfile::from_millis(
        service_units * UNIT_MS,
        timeout_units * UNIT_MS,
    ))
}

/// Queue an arrival in a specific room, bypassing round-robin admission.
fn admit_to(scheduler: &Scheduler, room: RoomId, arrival: Arrival) {
    scheduler.log().record_arrival(&arrival);
    scheduler.rooms()[room].enqueue(arrival);
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

fn all_terminal(engine: &EngineHandle) -> bool {
    let summary = engine.scheduler().log().summary();
    summary.waiting == 0 && summary.in_service == 0
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn same_level_patients_are_served_in_arrival_order() {
    let engine = start_engine(&config(1, 1, uniform(5, 60))).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    let first = Utc::now();
    scheduler.admit(Arrival::new(1, UrgencyLevel::Urgent, first));
    thread::sleep(Duration::from_millis(UNIT_MS));
    scheduler.admit(Arrival::new(2, UrgencyLevel::Urgent, Utc::now()));

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&engine)));
    let log = scheduler.log();
    let a = log.get(1).unwrap();
    let b = log.get(2).unwrap();
    assert_eq!(a.state(), PatientState::Completed);
    assert_eq!(b.state(), PatientState::Completed);
    assert!(a.service_start.unwrap() < b.service_start.unwrap());
    assert!(b.service_start.unwrap() >= a.service_end.unwrap());
    assert!(a.service_secs.unwrap() >= 0.09);

    engine.shutdown();
}

#[test]
fn more_urgent_patient_jumps_the_queue() {
    let engine = start_engine(&config(1, 1, uniform(5, 600))).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    // Keep the only doctor busy while two more patients queue up.
    scheduler.admit(Arrival::new(1, UrgencyLevel::Standard, Utc::now()));
    assert!(wait_until(Duration::from_secs(2), || {
        scheduler.log().get(1).unwrap().state() == PatientState::InService
    }));
    scheduler.admit(Arrival::new(2, UrgencyLevel::Standard, Utc::now()));
    scheduler.admit(Arrival::new(3, UrgencyLevel::Critical, Utc::now()));

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&engine)));
    let log = scheduler.log();
    let standard = log.get(2).unwrap();
    let critical = log.get(3).unwrap();
    assert!(critical.service_start.unwrap() < standard.service_start.unwrap());

    engine.shutdown();
}

#[test]
fn idle_room_borrows_critical_patients() {
    let levels = LevelTable {
        vermelho: UrgencyProfile::from_millis(5 * UNIT_MS, 600 * UNIT_MS),
        ..uniform(1, 600)
    };
    let engine = start_engine(&config(2, 1, levels)).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    for id in 1..=3 {
        admit_to(&scheduler, 0, Arrival::new(id, UrgencyLevel::Critical, Utc::now()));
    }

    assert!(wait_until(Duration::from_secs(5), || all_terminal(&engine)));
    let snapshot = scheduler.log().snapshot();
    let served_in_b: Vec<_> = snapshot
        .records
        .values()
        .filter(|r| r.room == Some(1))
        .collect();
    assert!(!served_in_b.is_empty(), "room 1 never borrowed a patient");
    for record in served_in_b {
        assert_eq!(record.state(), PatientState::Completed);
        assert_eq!(record.doctor.unwrap().room, 1);
    }

    engine.shutdown();
}

#[test]
fn patient_abandons_when_no_doctor_frees_up() {
    let levels = LevelTable {
        vermelho: UrgencyProfile::from_millis(10 * UNIT_MS, 600 * UNIT_MS),
        amarelo: UrgencyProfile::from_millis(UNIT_MS, 600 * UNIT_MS),
        verde: UrgencyProfile::from_millis(UNIT_MS, 2 * UNIT_MS),
    };
    let engine = start_engine(&config(1, 1, levels)).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    scheduler.admit(Arrival::new(1, UrgencyLevel::Critical, Utc::now()));
    assert!(wait_until(Duration::from_secs(2), || {
        scheduler.log().get(1).unwrap().state() == PatientState::InService
    }));
    scheduler.admit(Arrival::new(2, UrgencyLevel::Standard, Utc::now()));

    assert!(wait_until(Duration::from_secs(2), || {
        scheduler.log().get(2).unwrap().state() == PatientState::Abandoned
    }));
    let record = scheduler.log().get(2).unwrap();
    assert!(record.abandoned);
    assert!(record.service_start.is_none());
    assert!(record.service_end.is_some());
    assert_eq!(record.room, Some(0));
    let waited = record.waited_secs.unwrap();
    let budget = (2 * UNIT_MS) as f64 / 1_000.0;
    assert!(waited > budget, "waited {waited}");
    assert!(waited < budget + 0.2, "waited {waited}");

    // The doctor finishes its patient; the abandoned one is never served.
    assert!(wait_until(Duration::from_secs(2), || all_terminal(&engine)));
    assert_eq!(scheduler.log().get(2).unwrap().state(), PatientState::Abandoned);

    engine.shutdown();
}

#[test]
fn every_patient_reaches_exactly_one_terminal_state() {
    let levels = LevelTable {
        vermelho: UrgencyProfile::from_millis(UNIT_MS, 100 * UNIT_MS),
        amarelo: UrgencyProfile::from_millis(UNIT_MS / 2, 4 * UNIT_MS),
        verde: UrgencyProfile::from_millis(UNIT_MS / 4, UNIT_MS),
    };
    let engine = start_engine(&config(3, 2, levels)).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    let names = ["vermelho", "amarelo", "verde", "roxo"];
    let producers: Vec<_> = (0..4_u64)
        .map(|p| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                for i in 0..15_u64 {
                    let id = p * 100 + i;
                    let level = UrgencyLevel::from_wire(names[usize::try_from(id % 4).unwrap()]);
                    scheduler.admit(Arrival::new(id, level, Utc::now()));
                    thread::sleep(Duration::from_millis(2));
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(20), || all_terminal(&engine)));
    let summary = scheduler.log().summary();
    assert_eq!(summary.total, 60);
    assert_eq!(summary.served + summary.abandoned, 60);
    for record in scheduler.log().snapshot().records.values() {
        if record.abandoned {
            assert!(record.service_start.is_none() && record.service_secs.is_none());
        } else {
            assert!(record.service_start.is_some() && record.service_end.is_some());
        }
    }
    assert_eq!(scheduler.queue_depths(), vec![0, 0, 0]);
    assert_eq!(scheduler.occupancy().busy_count(), 0);

    engine.shutdown();
}

#[test]
fn snapshot_file_is_never_torn() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs.json");
    let mut cfg = config(2, 2, uniform(1, 600));
    cfg.log_path = Some(log_path.clone());
    cfg.occupancy_path = Some(dir.path().join("med_status.json"));
    let engine = start_engine(&cfg).unwrap();
    let scheduler = Arc::clone(engine.scheduler());

    let reader = thread::spawn(move || {
        let mut parsed = 0;
        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(500) {
            if let Ok(bytes) = std::fs::read(&log_path) {
                serde_json::from_slice::<serde_json::Value>(&bytes).expect("torn snapshot");
                parsed += 1;
            }
        }
        parsed
    });
    for id in 0..40 {
        scheduler.admit(Arrival::new(id, UrgencyLevel::Urgent, Utc::now()));
    }
    assert!(reader.join().unwrap() > 0);
    assert!(wait_until(Duration::from_secs(10), || all_terminal(&engine)));

    engine.shutdown();
}

#[test]
fn shutdown_lets_in_progress_service_finish() {
    let engine = start_engine(&config(1, 1, uniform(5, 600))).unwrap();
    let scheduler = Arc::clone(engine.scheduler());
    scheduler.admit(Arrival::new(1, UrgencyLevel::Urgent, Utc::now()));
    assert!(wait_until(Duration::from_secs(2), || {
        scheduler.log().get(1).unwrap().state() == PatientState::InService
    }));

    engine.shutdown();
    assert_eq!(scheduler.log().get(1).unwrap().state(), PatientState::Completed);
}

#[test]
fn scheduler_without_threads_leaves_patients_queued() {
    let scheduler = build_scheduler(&config(2, 1, uniform(1, 600))).unwrap();
    scheduler.admit(Arrival::new(1, UrgencyLevel::Standard, Utc::now()));
    scheduler.admit(Arrival::new(2, UrgencyLevel::Standard, Utc::now()));
    assert_eq!(scheduler.queue_depths(), vec![1, 1]);
    assert_eq!(scheduler.log().summary().waiting, 2);
}
