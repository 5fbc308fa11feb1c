use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Minutes a pump suspend lasts when the record carries no duration.
pub const DEFAULT_SUSPEND_MINUTES: f64 = 30.0;

/// A temporary basal override. A pump suspend is a zero-rate override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempBasal {
    pub start: DateTime<Utc>,
    /// Units per hour.
    pub rate: f64,
    pub duration: TimeDelta,
}

impl TempBasal {
    pub fn new(start: DateTime<Utc>, rate: f64, duration: TimeDelta) -> Self {
        Self {
            start,
            rate,
            duration,
        }
    }

    /// Build an override from a duration in (possibly fractional) minutes.
    pub fn from_minutes(start: DateTime<Utc>, rate: f64, minutes: f64) -> Self {
        let seconds: qtty::Seconds = qtty::Minutes::new(minutes).to();
        Self::new(
            start,
            rate,
            TimeDelta::milliseconds((seconds.value() * 1000.0).round() as i64),
        )
    }

    pub fn suspend(start: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self::new(start, 0.0, duration)
    }

    /// Nominal end, ignoring any later override that cancels this one early.
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }

    /// Whether `t` lies in `[start, end)`.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end()
    }
}

/// A discrete insulin dose.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bolus {
    pub at: DateTime<Utc>,
    pub units: f64,
}

impl Bolus {
    pub fn new(at: DateTime<Utc>, units: f64) -> Self {
        Self { at, units }
    }
}

/// Treatments fetched for one range, split by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Treatments {
    pub temp_basals: Vec<TempBasal>,
    pub boluses: Vec<Bolus>,
}
