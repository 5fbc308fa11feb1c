//! Expansion of local-time basal schedules into a UTC rate timeline.
//!
//! A schedule entry such as "06:00 → 0.8 U/h" recurs at a local wall-clock
//! time, so each occurrence is localized on its own local calendar day instead
//! of assuming a fixed UTC offset. Stepping whole local days rather than 24 h
//! of UTC keeps a 23-hour spring-forward day from being skipped.

use std::collections::BTreeMap;
use std::ops::Bound::{Excluded, Unbounded};

use chrono::{DateTime, LocalResult, NaiveDateTime, Offset, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use log::debug;

use crate::models::BasalProfile;

/// Dense map of rate-change instant → scheduled rate (units per hour).
///
/// The rate in force at `t` is the value at the greatest key `<= t`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileTimeline {
    changes: BTreeMap<DateTime<Utc>, f64>,
}

impl ProfileTimeline {
    /// Materialize `profiles` up to `until`.
    ///
    /// Each profile is in force from its effective-from instant until the next
    /// profile takes over, the last one until `until`. The effective-from
    /// instant itself carries the profile's rate for that local time of day;
    /// every schedule entry that falls strictly inside the profile's span is
    /// added on top.
    pub fn materialize(profiles: &[BasalProfile], until: DateTime<Utc>) -> Self {
        let mut ordered: Vec<&BasalProfile> = profiles
            .iter()
            .filter(|p| p.effective_from < until)
            .collect();
        ordered.sort_by_key(|p| p.effective_from);

        let mut changes = BTreeMap::new();
        for (idx, profile) in ordered.iter().enumerate() {
            let from = profile.effective_from;
            let to = ordered
                .get(idx + 1)
                .map(|next| next.effective_from)
                .unwrap_or(until);
            if to <= from {
                // Superseded by a record with the same effective-from.
                continue;
            }

            let tz = profile.timezone;
            changes.insert(from, profile.rate_at_local(from.with_timezone(&tz).time()));

            // One local day of margin on each side; the open `(from, to)`
            // filter drops occurrences outside the span.
            let first_day = from.with_timezone(&tz).date_naive() - TimeDelta::days(1);
            let last_day = to.with_timezone(&tz).date_naive() + TimeDelta::days(1);
            for local_date in first_day.iter_days().take_while(|d| *d <= last_day) {
                for entry in profile.entries() {
                    let at = resolve_local(&tz, local_date.and_time(entry.time));
                    if from < at && at < to {
                        changes.insert(at, entry.rate);
                    }
                }
            }
        }

        debug!(
            "Materialized {} profiles into {} rate changes up to {}",
            ordered.len(),
            changes.len(),
            until
        );

        Self { changes }
    }

    /// Scheduled rate in force at `t`, or `None` before the first profile.
    pub fn rate_at(&self, t: DateTime<Utc>) -> Option<f64> {
        self.changes.range(..=t).next_back().map(|(_, rate)| *rate)
    }

    /// First rate change strictly after `t`.
    pub fn next_change_after(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.changes
            .range((Excluded(t), Unbounded))
            .next()
            .map(|(at, _)| *at)
    }

    /// Earliest instant with a defined rate.
    pub fn coverage_start(&self) -> Option<DateTime<Utc>> {
        self.changes.keys().next().copied()
    }

    pub fn changes(&self) -> &BTreeMap<DateTime<Utc>, f64> {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Map a local wall-clock time to UTC.
///
/// Ambiguous times (clocks going back) take the earlier instant. Times that do
/// not exist (clocks going forward) use the offset in force before the gap, so
/// they land the length of the gap later on the wall clock.
fn resolve_local(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            let offset = tz
                .offset_from_utc_datetime(&(local - TimeDelta::days(1)))
                .fix();
            (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
        }
    }
}

#[cfg(test)]
#[path = "materializer_tests.rs"]
mod tests;
