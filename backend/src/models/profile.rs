use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One step of a basal schedule: from `time` (local wall clock) the pump
/// delivers `rate` units per hour until the next entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasalEntry {
    pub time: NaiveTime,
    pub rate: f64,
}

impl BasalEntry {
    pub fn new(time: NaiveTime, rate: f64) -> Self {
        Self { time, rate }
    }
}

/// Why a schedule cannot be turned into a [`BasalProfile`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    #[error("Basal profile effective from {effective_from} has no entries")]
    NoEntries { effective_from: DateTime<Utc> },

    #[error("Basal profile effective from {effective_from} has invalid rate {rate} at {time}")]
    InvalidRate {
        effective_from: DateTime<Utc>,
        time: NaiveTime,
        rate: f64,
    },
}

/// A basal schedule in force from `effective_from` until the next profile.
///
/// Entries are kept sorted by local time of day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasalProfile {
    pub effective_from: DateTime<Utc>,
    pub timezone: Tz,
    entries: Vec<BasalEntry>,
}

impl BasalProfile {
    /// Build a profile, sorting `entries` by time of day.
    ///
    /// Fails when the schedule is empty or carries a negative or non-finite rate.
    pub fn new(
        effective_from: DateTime<Utc>,
        timezone: Tz,
        mut entries: Vec<BasalEntry>,
    ) -> Result<Self, ProfileError> {
        if entries.is_empty() {
            return Err(ProfileError::NoEntries { effective_from });
        }
        if let Some(bad) = entries.iter().find(|e| !e.rate.is_finite() || e.rate < 0.0) {
            return Err(ProfileError::InvalidRate {
                effective_from,
                time: bad.time,
                rate: bad.rate,
            });
        }
        entries.sort_by_key(|e| e.time);
        Ok(Self {
            effective_from,
            timezone,
            entries,
        })
    }

    pub fn entries(&self) -> &[BasalEntry] {
        &self.entries
    }

    /// Rate scheduled at a local time of day.
    ///
    /// Times before the first entry fall under the last entry of the previous day.
    pub fn rate_at_local(&self, time: NaiveTime) -> f64 {
        self.entries
            .iter()
            .rev()
            .find(|e| e.time <= time)
            .or_else(|| self.entries.last())
            .map(|e| e.rate)
            .unwrap_or(0.0)
    }
}
