//! Wall-clock helpers. All engine timestamps are UTC instants.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Current UTC instant.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Seconds elapsed from `earlier` to `later`, as a float.
///
/// Negative spans (clock skew between client and server) clamp to zero.
#[must_use]
pub fn seconds_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let span = later.signed_duration_since(earlier);
    #[allow(clippy::cast_precision_loss)]
    let secs = span.num_microseconds().map_or_else(
        || span.num_milliseconds() as f64 / 1_000.0,
        |us| us as f64 / 1_000_000.0,
    );
    secs.max(0.0)
}

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339 text (`2024-05-01T10:00:00.5Z`, `...+01:00`) and naive
/// date-times without an offset, which are taken as UTC.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let raw = raw.trim();
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

/// Serde adapter for [`parse_instant`].
pub fn deserialize_instant<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).map_err(|e| serde::de::Error::custom(format!("timestamp `{raw}`: {e}")))
}

/// Serde adapter for a nullable [`parse_instant`] field.
pub fn deserialize_optional_instant<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| {
            parse_instant(&raw)
                .map_err(|e| serde::de::Error::custom(format!("timestamp `{raw}`: {e}")))
        })
        .transpose()
}
