//! Point-in-time and range queries over temp basals and boluses.

use chrono::{DateTime, Utc};

use crate::models::{Bolus, DeliveryWindow, TempBasal};

/// Temp basal overrides ordered by start.
///
/// When several overrides contain an instant, the one started last wins: a new
/// temp basal command cancels whatever was running before it.
#[derive(Debug, Clone, Default)]
pub struct TempBasalSet {
    events: Vec<TempBasal>,
}

impl TempBasalSet {
    pub fn new(mut events: Vec<TempBasal>) -> Self {
        // Stable sort: for equal starts the later record keeps winning.
        events.sort_by_key(|e| e.start);
        Self { events }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TempBasal> {
        self.events.iter()
    }

    /// The override in force at `t`, if any.
    pub fn active_override(&self, t: DateTime<Utc>) -> Option<&TempBasal> {
        let started = self.events.partition_point(|e| e.start <= t);
        self.events[..started].iter().rev().find(|e| e.contains(t))
    }

    /// Smallest override start strictly after `t`.
    pub fn next_override_start(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let idx = self.events.partition_point(|e| e.start <= t);
        self.events.get(idx).map(|e| e.start)
    }

    /// Nominal end of the override in force at `t`.
    ///
    /// An override cancelled early by a newer one still reports its own nominal
    /// end; the caller bounds it with [`TempBasalSet::next_override_start`].
    pub fn override_interval_end(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.active_override(t).map(TempBasal::end)
    }
}

impl FromIterator<TempBasal> for TempBasalSet {
    fn from_iter<I: IntoIterator<Item = TempBasal>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Bolus doses ordered by instant.
#[derive(Debug, Clone, Default)]
pub struct BolusLedger {
    doses: Vec<Bolus>,
}

impl BolusLedger {
    pub fn new(mut doses: Vec<Bolus>) -> Self {
        doses.sort_by_key(|b| b.at);
        Self { doses }
    }

    pub fn len(&self) -> usize {
        self.doses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doses.is_empty()
    }

    /// Doses with `window.start <= at < window.end`, in time order.
    pub fn boluses_in<'a>(&'a self, window: &DeliveryWindow) -> impl Iterator<Item = &'a Bolus> {
        let lo = self.doses.partition_point(|b| b.at < window.start());
        let hi = self.doses.partition_point(|b| b.at < window.end());
        self.doses[lo..hi.max(lo)].iter()
    }

    /// Total units dosed within the half-open window.
    pub fn sum_boluses(&self, window: &DeliveryWindow) -> f64 {
        self.boluses_in(window).map(|b| b.units).sum()
    }
}

impl FromIterator<Bolus> for BolusLedger {
    fn from_iter<I: IntoIterator<Item = Bolus>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    fn mins(m: i64) -> DateTime<Utc> {
        t0() + TimeDelta::minutes(m)
    }

    fn overlapping() -> TempBasalSet {
        TempBasalSet::new(vec![
            TempBasal::new(mins(10), 0.5, TimeDelta::minutes(30)),
            TempBasal::new(mins(0), 2.0, TimeDelta::minutes(60)),
        ])
    }

    #[test]
    fn test_active_override_latest_start_wins() {
        let set = overlapping();
        assert_eq!(set.active_override(mins(5)).unwrap().rate, 2.0);
        assert_eq!(set.active_override(mins(10)).unwrap().rate, 0.5);
        assert_eq!(set.active_override(mins(39)).unwrap().rate, 0.5);
    }

    #[test]
    fn test_active_override_falls_back_to_older_still_running() {
        // B ended at +40 but A nominally runs to +60; per-instant lookup sees A again.
        let set = overlapping();
        assert_eq!(set.active_override(mins(45)).unwrap().rate, 2.0);
        assert!(set.active_override(mins(60)).is_none());
        assert!(set.active_override(mins(-1)).is_none());
    }

    #[test]
    fn test_next_override_start_is_strict() {
        let set = overlapping();
        assert_eq!(set.next_override_start(mins(-5)), Some(mins(0)));
        assert_eq!(set.next_override_start(mins(0)), Some(mins(10)));
        assert_eq!(set.next_override_start(mins(10)), None);
    }

    #[test]
    fn test_override_interval_end_uses_same_tie_break() {
        let set = overlapping();
        assert_eq!(set.override_interval_end(mins(5)), Some(mins(60)));
        assert_eq!(set.override_interval_end(mins(15)), Some(mins(40)));
        assert_eq!(set.override_interval_end(mins(70)), None);
    }

    #[test]
    fn test_equal_starts_keep_last_record() {
        let set = TempBasalSet::new(vec![
            TempBasal::new(mins(0), 1.0, TimeDelta::minutes(30)),
            TempBasal::new(mins(0), 3.0, TimeDelta::minutes(30)),
        ]);
        assert_eq!(set.active_override(mins(1)).unwrap().rate, 3.0);
    }

    #[test]
    fn test_sum_boluses_half_open() {
        let ledger = BolusLedger::new(vec![
            Bolus::new(mins(60), 5.0),
            Bolus::new(mins(0), 2.0),
            Bolus::new(mins(30), 3.0),
            Bolus::new(mins(-1), 7.0),
        ]);
        let window = DeliveryWindow::new(mins(0), mins(60)).unwrap();

        assert_eq!(ledger.sum_boluses(&window), 5.0);
        assert_eq!(ledger.boluses_in(&window).count(), 2);
    }

    #[test]
    fn test_sum_boluses_empty_window() {
        let ledger = BolusLedger::new(vec![Bolus::new(mins(0), 2.0)]);
        let window = DeliveryWindow::new(mins(0), mins(0)).unwrap();
        assert_eq!(ledger.sum_boluses(&window), 0.0);
    }
}
