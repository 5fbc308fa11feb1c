//! Basal integration and bolus summation over a delivery window.
//!
//! The reconciler walks a cursor from window start to window end. At each
//! step it takes the rate in force (a temp basal if one is active, otherwise
//! the scheduled profile rate), finds the next instant the rate could change,
//! and integrates the rate over that span.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use log::{debug, trace};

use super::intervals::{BolusLedger, TempBasalSet};
use super::materializer::ProfileTimeline;
use super::report::DeliveryReport;
use crate::error::{DeliveryError, DeliveryResult};
use crate::models::DeliveryWindow;

/// The three snapshots a window is reconciled against.
#[derive(Debug, Clone, Default)]
pub struct DeliveryInputs {
    pub timeline: ProfileTimeline,
    pub overrides: TempBasalSet,
    pub boluses: BolusLedger,
}

impl DeliveryInputs {
    pub fn new(timeline: ProfileTimeline, overrides: TempBasalSet, boluses: BolusLedger) -> Self {
        Self {
            timeline,
            overrides,
            boluses,
        }
    }

    /// Rate in force at `t`: the active temp basal, else the scheduled rate.
    pub fn active_rate(&self, t: DateTime<Utc>) -> DeliveryResult<f64> {
        if let Some(temp) = self.overrides.active_override(t) {
            return Ok(temp.rate);
        }
        self.timeline
            .rate_at(t)
            .ok_or(DeliveryError::MissingRate { at: t })
    }

    /// Next instant after `t` at which the rate may change, capped at `end`.
    ///
    /// An override cancelled early by a newer one is bounded by the newer
    /// start, since both its nominal end and the next start are candidates.
    pub fn next_horizon(&self, t: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
        [
            self.overrides.override_interval_end(t),
            self.overrides.next_override_start(t),
            self.timeline.next_change_after(t),
            Some(next_hour(t)),
        ]
        .into_iter()
        .flatten()
        .fold(end, std::cmp::min)
    }
}

/// Reconcile `window` against `inputs`.
///
/// Basal units come from integrating the active rate; bolus units from summing
/// doses in `[start, end)`. An empty window reports zero for both. A window
/// instant with neither a temp basal nor a profile rate fails with
/// [`DeliveryError::MissingRate`].
pub fn compute_delivery(
    inputs: &DeliveryInputs,
    window: &DeliveryWindow,
) -> DeliveryResult<DeliveryReport> {
    let mut report = DeliveryReport::empty(*window);
    let mut current = window.start();
    let mut steps = 0usize;

    while current < window.end() {
        let rate = inputs.active_rate(current)?;
        let horizon = inputs.next_horizon(current, window.end());
        let units = rate * hours_between(current, horizon);
        trace!("{} → {} at {} U/h: {:.4} U", current, horizon, rate, units);

        report.basal_units += units;
        report.hourly.entry(hour_start(current)).or_default().basal += units;
        current = horizon;
        steps += 1;
    }

    for bolus in inputs.boluses.boluses_in(window) {
        report.bolus_units += bolus.units;
        report.hourly.entry(hour_start(bolus.at)).or_default().bolus += bolus.units;
    }

    let total = report.total_units();
    for hour in report.hourly.values_mut() {
        hour.percent_of_total = if total > 0.0 {
            hour.total() / total * 100.0
        } else {
            0.0
        };
    }

    debug!(
        "Reconciled {} → {} in {} steps: basal={:.3} U, bolus={:.3} U",
        window.start(),
        window.end(),
        steps,
        report.basal_units,
        report.bolus_units
    );

    Ok(report)
}

fn hour_start(t: DateTime<Utc>) -> DateTime<Utc> {
    t.duration_trunc(TimeDelta::hours(1)).unwrap_or(t)
}

fn next_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    hour_start(t) + TimeDelta::hours(1)
}

fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = qtty::Seconds::new((to - from).num_milliseconds() as f64 / 1000.0);
    let hours: qtty::Hours = seconds.to();
    hours.value()
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
