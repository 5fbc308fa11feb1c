//! In-memory local source implementation.
//!
//! Holds parsed profiles, treatments and glucose readings in memory. Useful
//! for tests, and for replaying an exported Nightscout snapshot offline.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;

use super::error::{ErrorContext, SourceError, SourceResult};
use super::{Collection, NightscoutSource};
use crate::models::{BasalProfile, Bolus, GlucoseReading, TempBasal, Treatments};
use crate::parsing::{parse_glucose, parse_profiles, parse_treatments};

/// Raw Nightscout arrays as exported from the three collections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub profiles: Vec<Value>,
    #[serde(default)]
    pub treatments: Vec<Value>,
    #[serde(default)]
    pub entries: Vec<Value>,
}

/// In-memory source.
///
/// # Example
/// ```ignore
/// use ns_insulin::source::LocalSource;
///
/// let source = LocalSource::new();
/// source.add_profile(profile);
/// source.add_bolus(Bolus::new(at, 2.0));
/// ```
#[derive(Clone, Default)]
pub struct LocalSource {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    profiles: Vec<BasalProfile>,
    treatments: Treatments,
    glucose: Vec<GlucoseReading>,
    profile_queries: Vec<(DateTime<Utc>, DateTime<Utc>)>,
    unhealthy: bool,
}

impl LocalSource {
    /// Create a new empty local source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a source from raw Nightscout records.
    pub fn from_snapshot(snapshot: Snapshot) -> SourceResult<Self> {
        let profiles = parse_profiles(snapshot.profiles).map_err(|e| {
            SourceError::parse_with_context(
                e,
                ErrorContext::new("load_snapshot").with_collection(Collection::Profiles.name()),
            )
        })?;
        let treatments = parse_treatments(snapshot.treatments).map_err(|e| {
            SourceError::parse_with_context(
                e,
                ErrorContext::new("load_snapshot").with_collection(Collection::Treatments.name()),
            )
        })?;
        let glucose = parse_glucose(snapshot.entries).map_err(|e| {
            SourceError::parse_with_context(
                e,
                ErrorContext::new("load_snapshot").with_collection(Collection::Entries.name()),
            )
        })?;

        info!(
            "Loaded snapshot: {} profiles, {} temp basals, {} boluses, {} glucose readings",
            profiles.len(),
            treatments.temp_basals.len(),
            treatments.boluses.len(),
            glucose.len()
        );

        Ok(Self {
            data: Arc::new(RwLock::new(LocalData {
                profiles,
                treatments,
                glucose,
                ..Default::default()
            })),
        })
    }

    /// Build a source from a JSON snapshot `{ "profiles": [...], "treatments": [...], "entries": [...] }`.
    pub fn from_snapshot_json(json: &str) -> SourceResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json).map_err(|e| {
            SourceError::decode_with_context(e.to_string(), ErrorContext::new("load_snapshot"))
        })?;
        Self::from_snapshot(snapshot)
    }

    /// Build a source from a JSON snapshot file.
    pub fn from_snapshot_file<P: AsRef<Path>>(path: P) -> SourceResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SourceError::configuration(format!(
                "Failed to read snapshot {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_snapshot_json(&content)
    }

    pub fn add_profile(&self, profile: BasalProfile) {
        self.data.write().profiles.push(profile);
    }

    pub fn add_temp_basal(&self, temp_basal: TempBasal) {
        self.data.write().treatments.temp_basals.push(temp_basal);
    }

    pub fn add_bolus(&self, bolus: Bolus) {
        self.data.write().treatments.boluses.push(bolus);
    }

    pub fn add_glucose(&self, reading: GlucoseReading) {
        self.data.write().glucose.push(reading);
    }

    /// Make `health_check` report the source as down.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().unhealthy = !healthy;
    }

    /// Ranges requested through `fetch_profiles`, oldest request first.
    pub fn profile_queries(&self) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
        self.data.read().profile_queries.clone()
    }
}

fn in_range(t: DateTime<Utc>, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    from <= t && t <= to
}

#[async_trait]
impl NightscoutSource for LocalSource {
    async fn health_check(&self) -> SourceResult<bool> {
        Ok(!self.data.read().unhealthy)
    }

    async fn fetch_profiles(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<BasalProfile>> {
        let mut data = self.data.write();
        data.profile_queries.push((from, to));
        Ok(data
            .profiles
            .iter()
            .filter(|p| in_range(p.effective_from, from, to))
            .cloned()
            .collect())
    }

    async fn fetch_treatments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Treatments> {
        let data = self.data.read();
        Ok(Treatments {
            temp_basals: data
                .treatments
                .temp_basals
                .iter()
                .filter(|t| in_range(t.start, from, to))
                .copied()
                .collect(),
            boluses: data
                .treatments
                .boluses
                .iter()
                .filter(|b| in_range(b.at, from, to))
                .copied()
                .collect(),
        })
    }

    async fn fetch_glucose(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<GlucoseReading>> {
        Ok(self
            .data
            .read()
            .glucose
            .iter()
            .filter(|g| in_range(g.at, from, to))
            .copied()
            .collect())
    }

    fn describe(&self) -> String {
        let data = self.data.read();
        format!(
            "local ({} profiles, {} treatments)",
            data.profiles.len(),
            data.treatments.temp_basals.len() + data.treatments.boluses.len()
        )
    }
}
