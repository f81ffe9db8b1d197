//! Serde helpers for the timestamp shapes the document store emits.
//!
//! The REST layer is not consistent: depending on the endpoint a timestamp
//! arrives as an RFC 3339 string, as epoch milliseconds, or as a raw store
//! timestamp object (`{"_seconds": .., "_nanoseconds": ..}` or the same
//! without underscores).

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
    Object {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(alias = "_nanoseconds", default)]
        nanoseconds: u32,
    },
}

impl RawTimestamp {
    fn into_utc<E: de::Error>(self) -> Result<DateTime<Utc>, E> {
        match self {
            RawTimestamp::Millis(ms) => Utc
                .timestamp_millis_opt(ms)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {ms}"))),
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| E::custom(format!("invalid timestamp '{text}': {e}"))),
            RawTimestamp::Object { seconds, nanoseconds } => Utc
                .timestamp_opt(seconds, nanoseconds)
                .single()
                .ok_or_else(|| E::custom(format!("timestamp out of range: {seconds}s"))),
        }
    }
}

/// Deserializes a required timestamp.
pub fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    RawTimestamp::deserialize(deserializer)?.into_utc()
}

/// Deserializes an optional timestamp; `null` and a missing field are `None`.
pub fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawTimestamp>::deserialize(deserializer)? {
        Some(raw) => raw.into_utc().map(Some),
        None => Ok(None),
    }
}
