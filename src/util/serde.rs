//! Identifier and classification types shared across the engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Patient identifier as sent by the arrival client.
pub type PatientId = u64;

/// Room identifier (rooms are numbered from 0).
pub type RoomId = usize;

/// Priority rank given to levels outside the fixed enumeration.
pub const UNKNOWN_RANK: u8 = 99;

/// Urgency classification of an arriving patient.
///
/// The three recognised tiers use their wire names (`vermelho`, `amarelo`,
/// `verde`). Any other string is kept verbatim in [`UrgencyLevel::Unrecognized`]
/// so the record still shows what the client sent.
///
/// Recognised tiers match case-insensitively after trimming and are always
/// written back under the lowercase wire name, so `"Vermelho "` is recorded as
/// `"vermelho"`. Only unrecognised text keeps the client's spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UrgencyLevel {
    /// Most urgent tier (`vermelho`).
    Critical,
    /// Intermediate tier (`amarelo`).
    Urgent,
    /// Least urgent recognised tier (`verde`).
    Standard,
    /// A level that failed validation against the enumeration.
    Unrecognized(String),
}

impl UrgencyLevel {
    /// All recognised tiers, most urgent first.
    pub const TIERS: [Self; 3] = [Self::Critical, Self::Urgent, Self::Standard];

    /// Queue priority rank: lower is served first.
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Urgent => 1,
            Self::Standard => 2,
            Self::Unrecognized(_) => UNKNOWN_RANK,
        }
    }

    /// Wire name of this level.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Critical => "vermelho",
            Self::Urgent => "amarelo",
            Self::Standard => "verde",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Classify a wire name, keeping unknown text verbatim.
    #[must_use]
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "vermelho" => Self::Critical,
            "amarelo" => Self::Urgent,
            "verde" => Self::Standard,
            _ => Self::Unrecognized(s.to_string()),
        }
    }

    /// Whether this level is one of the fixed tiers.
    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl FromStr for UrgencyLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_wire(s))
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UrgencyLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UrgencyLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

/// Doctor identity scoped to the room it works in.
///
/// Rendered as `"<room>-<doctor>"`, with doctors numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DoctorKey {
    /// Room the doctor belongs to.
    pub room: RoomId,
    /// Doctor number within the room, starting at 1.
    pub doctor: usize,
}

impl DoctorKey {
    /// Create a doctor key.
    #[must_use]
    pub const fn new(room: RoomId, doctor: usize) -> Self {
        Self { room, doctor }
    }
}

impl fmt::Display for DoctorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.room, self.doctor)
    }
}

impl FromStr for DoctorKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (room, doctor) = s
            .split_once('-')
            .ok_or_else(|| format!("doctor key `{s}` is not `<room>-<doctor>`"))?;
        let room = room
            .parse()
            .map_err(|e| format!("doctor key `{s}`: bad room: {e}"))?;
        let doctor = doctor
            .parse()
            .map_err(|e| format!("doctor key `{s}`: bad doctor: {e}"))?;
        Ok(Self { room, doctor })
    }
}

impl Serialize for DoctorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DoctorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
