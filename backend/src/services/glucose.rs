//! Glucose summaries over a delivery window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryResult;
use crate::models::{DeliveryWindow, GlucoseReading};
use crate::source::NightscoutSource;

/// Mean and count of the readings in a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseSummary {
    pub readings: usize,
    /// `None` when there are no readings.
    pub average_mmol_per_l: Option<f64>,
}

/// Mean glucose (mmol/L) of the readings taken in `[from, to]`.
pub fn average_glucose(
    readings: &[GlucoseReading],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Option<f64> {
    let (sum, count) = readings
        .iter()
        .filter(|r| from <= r.at && r.at <= to)
        .fold((0.0, 0usize), |(sum, count), r| (sum + r.mmol_per_l, count + 1));

    (count > 0).then(|| sum / count as f64)
}

/// Fetch the window's glucose readings and summarize them.
pub async fn glucose_summary(
    source: &dyn NightscoutSource,
    window: &DeliveryWindow,
) -> DeliveryResult<GlucoseSummary> {
    let readings = source.fetch_glucose(window.start(), window.end()).await?;
    let in_window = readings
        .iter()
        .filter(|r| window.start() <= r.at && r.at <= window.end())
        .count();

    Ok(GlucoseSummary {
        readings: in_window,
        average_mmol_per_l: average_glucose(&readings, window.start(), window.end()),
    })
}
