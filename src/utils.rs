use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Deserializer, Serializer};

use crate::error::AppError;

/// Fresh identifier for a stored document, as a 24-char hex string.
pub fn new_id() -> String {
    ObjectId::new().to_hex()
}

/// Checks that `raw` is a well-formed ObjectId and returns its canonical hex form.
pub fn parse_id(raw: &str, what: &str) -> Result<String, AppError> {
    ObjectId::parse_str(raw.trim())
        .map(|id| id.to_hex())
        .map_err(|_| AppError::Validation(format!("Invalid {what} id")))
}

/// Case-insensitive substring test shared by the in-memory filters.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Serde adapter storing timestamps as RFC 3339 with fixed millisecond precision.
///
/// Fixed precision keeps lexical order equal to time order, which lets the
/// database sort on the raw string.
pub mod rfc3339_millis {
    use super::*;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| format!("invalid ISO 8601 date: {raw}"))
}

/// Current time truncated to millisecond precision.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    Utc.timestamp_millis_opt(now.timestamp_millis())
        .single()
        .unwrap_or(now)
}
