//! Parsers for raw Nightscout records.
//!
//! Nightscout serves profiles, treatments and glucose entries as loosely typed
//! JSON. The parsers here turn those records into the model values the engine
//! consumes, rejecting anything the reconciliation cannot trust.
//!
//! # Parsers
//!
//! - [`nightscout::parse_profiles`]: basal profile records (`profiles` collection)
//! - [`nightscout::parse_treatments`]: temp basals, suspends and boluses (`treatments`)
//! - [`nightscout::parse_glucose`]: sensor glucose entries (`entries`)

pub mod nightscout;

#[cfg(test)]
mod nightscout_tests;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::models::ProfileError;

pub use nightscout::{parse_glucose, parse_profiles, parse_treatments};

/// Result type for parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error type for parsing raw records.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed {kind} record: {source}")]
    Json {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("Unknown time zone '{0}'")]
    UnknownTimezone(String),

    /// The profile store does not name exactly one "default" variant.
    #[error("Profile effective {effective_from} has {} 'default' variants: {candidates:?}", .candidates.len())]
    AmbiguousDefaultProfile {
        effective_from: String,
        candidates: Vec<String>,
    },

    #[error(transparent)]
    InvalidProfile(#[from] ProfileError),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Parse a Nightscout timestamp into UTC.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00.000Z`, `2024-01-01T05:00:00-05:00`)
/// and naive ISO-8601 (`2024-01-01T10:00:00`), which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> ParseResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = trimmed.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
        .ok_or_else(|| ParseError::Timestamp(raw.to_string()))
}
