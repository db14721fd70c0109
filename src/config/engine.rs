//! Engine configuration: listener, room layout, timing and urgency profiles.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::serde::UrgencyLevel;

/// Service and abandonment budget of one urgency tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyProfile {
    /// Time a doctor spends once service has started (milliseconds).
    pub service_ms: u64,
    /// Maximum queue wait before the patient abandons (milliseconds).
    pub abandon_timeout_ms: u64,
}

impl UrgencyProfile {
    /// Build a profile from millisecond values.
    #[must_use]
    pub const fn from_millis(service_ms: u64, abandon_timeout_ms: u64) -> Self {
        Self {
            service_ms,
            abandon_timeout_ms,
        }
    }

    /// Service duration.
    #[must_use]
    pub const fn service_duration(&self) -> Duration {
        Duration::from_millis(self.service_ms)
    }

    /// Abandonment timeout.
    #[must_use]
    pub const fn abandon_timeout(&self) -> Duration {
        Duration::from_millis(self.abandon_timeout_ms)
    }
}

/// Per-tier profiles. Unrecognised levels use the least urgent tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTable {
    /// Profile for `vermelho`.
    pub vermelho: UrgencyProfile,
    /// Profile for `amarelo`.
    pub amarelo: UrgencyProfile,
    /// Profile for `verde`.
    pub verde: UrgencyProfile,
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            vermelho: UrgencyProfile::from_millis(8_000, 120_000),
            amarelo: UrgencyProfile::from_millis(5_000, 60_000),
            verde: UrgencyProfile::from_millis(3_000, 30_000),
        }
    }
}

impl LevelTable {
    /// Same profile for every tier.
    #[must_use]
    pub const fn uniform(profile: UrgencyProfile) -> Self {
        Self {
            vermelho: profile,
            amarelo: profile,
            verde: profile,
        }
    }

    /// Profile governing a level.
    #[must_use]
    pub const fn profile(&self, level: &UrgencyLevel) -> UrgencyProfile {
        match level {
            UrgencyLevel::Critical => self.vermelho,
            UrgencyLevel::Urgent => self.amarelo,
            UrgencyLevel::Standard | UrgencyLevel::Unrecognized(_) => self.verde,
        }
    }

    fn validate(&self) -> Result<(), String> {
        for level in UrgencyLevel::TIERS {
            if self.profile(&level).service_ms == 0 {
                return Err(format!("service_ms for `{level}` must be greater than 0"));
            }
        }
        Ok(())
    }
}

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Number of independent rooms.
    pub rooms: usize,
    /// Doctors working in each room.
    pub doctors_per_room: usize,
    /// Interval between abandonment sweeps (milliseconds).
    pub sweep_interval_ms: u64,
    /// Bounded wait of an idle doctor before it retries stealing (milliseconds).
    pub steal_poll_interval_ms: u64,
    /// Maximum time spent reading one arrival message (milliseconds).
    pub read_timeout_ms: u64,
    /// Event Log snapshot file; `None` keeps the log in memory only.
    pub log_path: Option<PathBuf>,
    /// Occupancy snapshot file; `None` keeps the registry in memory only.
    pub occupancy_path: Option<PathBuf>,
    /// Urgency profiles.
    pub levels: LevelTable,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 9000,
            rooms: 3,
            doctors_per_room: 1,
            sweep_interval_ms: 1_000,
            steal_poll_interval_ms: 500,
            read_timeout_ms: 5_000,
            log_path: Some(PathBuf::from("logs.json")),
            occupancy_path: Some(PathBuf::from("med_status.json")),
            levels: LevelTable::default(),
        }
    }
}

impl EngineConfig {
    /// In-memory configuration with the given layout, for embedding and tests.
    #[must_use]
    pub fn in_memory(rooms: usize, doctors_per_room: usize) -> Self {
        Self {
            rooms,
            doctors_per_room,
            log_path: None,
            occupancy_path: None,
            ..Self::default()
        }
    }

    /// Replace the urgency profiles.
    #[must_use]
    pub fn with_levels(mut self, levels: LevelTable) -> Self {
        self.levels = levels;
        self
    }

    /// Replace the sweep interval.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_ms = duration_ms(interval);
        self
    }

    /// Replace the steal poll interval.
    #[must_use]
    pub const fn with_steal_poll_interval(mut self, interval: Duration) -> Self {
        self.steal_poll_interval_ms = duration_ms(interval);
        self
    }

    /// Sweep interval as a duration.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    /// Steal poll interval as a duration.
    #[must_use]
    pub const fn steal_poll_interval(&self) -> Duration {
        Duration::from_millis(self.steal_poll_interval_ms)
    }

    /// Read timeout as a duration.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// `host:port` listen address.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.rooms == 0 {
            return Err("rooms must be greater than 0".into());
        }
        if self.doctors_per_room == 0 {
            return Err("doctors_per_room must be greater than 0".into());
        }
        if self.sweep_interval_ms == 0 {
            return Err("sweep_interval_ms must be greater than 0".into());
        }
        if self.steal_poll_interval_ms == 0 {
            return Err("steal_poll_interval_ms must be greater than 0".into());
        }
        if self.read_timeout_ms == 0 {
            return Err("read_timeout_ms must be greater than 0".into());
        }
        if self.host.trim().is_empty() {
            return Err("host must not be empty".into());
        }
        self.levels
            .validate()
            .map_err(|e| format!("levels invalid: {e}"))
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply `TRIAGE_*` environment overrides.
    ///
    /// `.env` files are picked up through `dotenvy` by the caller.
    pub fn apply_env(&mut self) -> Result<(), String> {
        if let Ok(host) = std::env::var("TRIAGE_HOST") {
            self.host = host;
        }
        if let Some(port) = env_number("TRIAGE_PORT")? {
            self.port = port;
        }
        if let Some(rooms) = env_number("TRIAGE_ROOMS")? {
            self.rooms = rooms;
        }
        if let Some(doctors) = env_number("TRIAGE_DOCTORS")? {
            self.doctors_per_room = doctors;
        }
        if let Ok(path) = std::env::var("TRIAGE_LOG_PATH") {
            self.log_path = Some(PathBuf::from(path));
        }
        if let Ok(path) = std::env::var("TRIAGE_STATUS_PATH") {
            self.occupancy_path = Some(PathBuf::from(path));
        }
        Ok(())
    }
}

fn env_number<T>(name: &str) -> Result<Option<T>, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{name}=`{raw}`: {e}")),
        Err(_) => Ok(None),
    }
}

const fn duration_ms(d: Duration) -> u64 {
    let ms = d.as_millis();
    if ms > u64::MAX as u128 {
        u64::MAX
    } else {
        ms as u64
    }
}
