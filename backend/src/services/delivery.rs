//! Delivery queries against a data source.
//!
//! A query fetches everything it needs up front (profiles covering the window
//! start, treatments that can affect the window), builds fresh engine inputs
//! and reconciles. Any fetch or coverage fault aborts the query.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{
    compute_delivery, BolusLedger, DeliveryInputs, DeliveryReport, ProfileTimeline, TempBasalSet,
};
use crate::error::{DeliveryError, DeliveryResult};
use crate::models::{BasalProfile, DeliveryWindow};
use crate::source::NightscoutSource;

/// Limits for the backward profile search and the treatment lookback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// First lookback, in days before the window end
    #[serde(default = "default_initial_lookback_days")]
    pub initial_lookback_days: u32,
    /// How far before the window start the search may reach
    #[serde(default = "default_max_lookback_days")]
    pub max_lookback_days: u32,
    /// Longest temp basal expected; treatments are fetched this far before the window
    #[serde(default = "default_max_override_minutes")]
    pub max_override_minutes: u32,
}

fn default_initial_lookback_days() -> u32 {
    3
}

fn default_max_lookback_days() -> u32 {
    730
}

fn default_max_override_minutes() -> u32 {
    1440
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            initial_lookback_days: default_initial_lookback_days(),
            max_lookback_days: default_max_lookback_days(),
            max_override_minutes: default_max_override_minutes(),
        }
    }
}

/// Runs delivery queries against one source.
pub struct DeliveryService<'a> {
    source: &'a dyn NightscoutSource,
    search: SearchConfig,
}

impl<'a> DeliveryService<'a> {
    pub fn new(source: &'a dyn NightscoutSource) -> Self {
        Self {
            source,
            search: SearchConfig::default(),
        }
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    pub fn search(&self) -> &SearchConfig {
        &self.search
    }

    /// Fetch profiles until at least one is in force at the window start.
    ///
    /// The lookback is measured back from the window end. It starts at
    /// `initial_lookback_days` and doubles each round until a fetched profile
    /// takes effect at or before the window start. Once the lookback reaches
    /// more than `max_lookback_days` before the window start without such a
    /// profile, the query fails with [`DeliveryError::CoverageFault`].
    pub async fn fetch_covering_profiles(
        &self,
        window: &DeliveryWindow,
    ) -> DeliveryResult<Vec<BasalProfile>> {
        let ceiling = window.start() - TimeDelta::days(i64::from(self.search.max_lookback_days));
        let mut lookback = TimeDelta::days(i64::from(self.search.initial_lookback_days.max(1)));
        let mut rounds = 0usize;

        loop {
            let from = window.end() - lookback;
            let profiles = self.source.fetch_profiles(from, window.end()).await?;
            rounds += 1;

            if covers(&profiles, window.start()) {
                debug!(
                    "Found {} profiles covering {} after {} rounds (lookback {} days)",
                    profiles.len(),
                    window.start(),
                    rounds,
                    lookback.num_days()
                );
                return Ok(profiles);
            }

            if from <= ceiling {
                warn!(
                    "No profile in force at {}; searched back to {}",
                    window.start(),
                    from
                );
                return Err(DeliveryError::CoverageFault {
                    required: window.start(),
                    searched_from: from,
                });
            }

            debug!(
                "{} profiles since {}, none in force at {}; widening",
                profiles.len(),
                from,
                window.start()
            );
            lookback = lookback * 2;
        }
    }

    /// Reconcile basal and bolus delivery over `window`.
    pub async fn delivery_for(&self, window: &DeliveryWindow) -> DeliveryResult<DeliveryReport> {
        window.require_non_empty()?;
        info!("Delivery query {} → {}", window.start(), window.end());

        let profiles = self.fetch_covering_profiles(window).await?;

        let treatments_from = self.treatments_from(window);
        let treatments = self
            .source
            .fetch_treatments(treatments_from, window.end())
            .await?;
        debug!(
            "Fetched {} temp basals and {} boluses since {}",
            treatments.temp_basals.len(),
            treatments.boluses.len(),
            treatments_from
        );

        let inputs = DeliveryInputs::new(
            ProfileTimeline::materialize(&profiles, window.end()),
            TempBasalSet::new(treatments.temp_basals),
            BolusLedger::new(treatments.boluses),
        );
        let report = compute_delivery(&inputs, window)?;

        info!(
            "Delivered {:.2} U basal + {:.2} U bolus over {} → {}",
            report.basal_units,
            report.bolus_units,
            window.start(),
            window.end()
        );
        Ok(report)
    }

    /// Earliest instant whose temp basal could still be running at the window start.
    fn treatments_from(&self, window: &DeliveryWindow) -> DateTime<Utc> {
        window.start() - TimeDelta::minutes(i64::from(self.search.max_override_minutes))
    }
}

fn covers(profiles: &[BasalProfile], start: DateTime<Utc>) -> bool {
    profiles.iter().any(|p| p.effective_from <= start)
}
