use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// mg/dL per mmol/L for glucose.
pub const MGDL_PER_MMOL: f64 = 18.016;

/// A sensor glucose reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub at: DateTime<Utc>,
    pub mmol_per_l: f64,
}

impl GlucoseReading {
    pub fn new(at: DateTime<Utc>, mmol_per_l: f64) -> Self {
        Self { at, mmol_per_l }
    }

    pub fn from_mgdl(at: DateTime<Utc>, mgdl: f64) -> Self {
        Self::new(at, mgdl / MGDL_PER_MMOL)
    }
}
