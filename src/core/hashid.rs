//! Time-Ordered Hash Identifiers
//!
//! Hash ids issued by nodes and cores are UUID v1 values. Their embedded
//! 60-bit timestamp is the submission time recorded in a proof header.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use uuid::Uuid;

/// Format of `hash_submitted_*_at` header fields.
pub const SUBMITTED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Errors decoding a hash id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HashIdError {
    /// Not a UUID.
    #[error("invalid hash id: {0}")]
    Invalid(String),

    /// UUID carries no timestamp (not a time-based version).
    #[error("hash id {0} carries no timestamp")]
    NotTimeOrdered(String),

    /// Timestamp outside the representable range.
    #[error("hash id {0} has an out of range timestamp")]
    OutOfRange(String),
}

/// Parse a hash id string.
pub fn parse_hash_id(s: &str) -> Result<Uuid, HashIdError> {
    Uuid::parse_str(s).map_err(|_| HashIdError::Invalid(s.to_string()))
}

/// Is `s` a well-formed hash id?
pub fn is_hash_id(s: &str) -> bool {
    parse_hash_id(s).is_ok()
}

/// Recover the submission time embedded in a time-ordered id.
pub fn submitted_at(id: &Uuid) -> Result<DateTime<Utc>, HashIdError> {
    let ts = id
        .get_timestamp()
        .ok_or_else(|| HashIdError::NotTimeOrdered(id.to_string()))?;
    let (secs, nanos) = ts.to_unix();
    let secs = i64::try_from(secs).map_err(|_| HashIdError::OutOfRange(id.to_string()))?;

    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| HashIdError::OutOfRange(id.to_string()))
}

/// Format a submission time the way proof headers carry it (second precision).
pub fn format_submitted_at(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Submission time string for a hash id string.
pub fn submitted_at_string(id: &str) -> Result<String, HashIdError> {
    let uuid = parse_hash_id(id)?;
    submitted_at(&uuid).map(|at| format_submitted_at(&at))
}

/// Is `s` a header timestamp (`YYYY-MM-DDTHH:MM:SSZ`)?
pub fn is_submitted_at(s: &str) -> bool {
    s.len() == 20 && NaiveDateTime::parse_from_str(s, SUBMITTED_AT_FORMAT).is_ok()
}
