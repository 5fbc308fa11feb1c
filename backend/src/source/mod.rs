//! Data sources for Nightscout records.
//!
//! The delivery service never talks to Nightscout directly. It asks a
//! [`NightscoutSource`] for parsed model values over a time range, so the same
//! query runs against a live server or an in-memory snapshot.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  DeliveryService (services::delivery)         │
//! └───────────────────┬───────────────────────────┘
//!                     │
//! ┌───────────────────▼───────────────────────────┐
//! │  NightscoutSource trait                       │
//! └─────────┬─────────────────────────┬───────────┘
//!           │                         │
//! ┌─────────▼─────────┐     ┌─────────▼───────────┐
//! │  LocalSource      │     │  NightscoutClient   │
//! │  (snapshot)       │     │  (REST, paginated)  │
//! └───────────────────┘     └─────────────────────┘
//! ```
//!
//! Use [`SourceFactory`] to build the source named by configuration.

#[cfg(not(any(feature = "local-source", feature = "nightscout-source")))]
compile_error!("Enable at least one data source feature.");

pub mod config;
pub mod error;
pub mod factory;
#[cfg(feature = "local-source")]
pub mod local;
#[cfg(feature = "nightscout-source")]
pub mod nightscout;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{BasalProfile, GlucoseReading, Treatments};

pub use config::{LocalSettings, NightscoutSettings, SourceConfig, SourceSettings};
pub use error::{ErrorContext, SourceError, SourceResult};
pub use factory::{SourceFactory, SourceType};
#[cfg(feature = "local-source")]
pub use local::LocalSource;
#[cfg(feature = "nightscout-source")]
pub use nightscout::{NightscoutClient, NightscoutClientConfig};

/// The Nightscout collections the engine reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    Treatments,
    Entries,
}

impl Collection {
    /// Path segment under `/api/v1/`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Treatments => "treatments",
            Self::Entries => "entries",
        }
    }

    /// Field the collection is filtered and ordered by.
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            Self::Profiles => "startDate",
            Self::Treatments => "created_at",
            Self::Entries => "dateString",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read access to Nightscout data.
///
/// All ranges are inclusive at both ends. Implementations return every record
/// in range, however many pages that takes.
#[async_trait]
pub trait NightscoutSource: Send + Sync {
    /// Check that the source is reachable.
    async fn health_check(&self) -> SourceResult<bool>;

    /// Basal profiles whose effective-from instant lies in `[from, to]`.
    async fn fetch_profiles(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<BasalProfile>>;

    /// Temp basals, suspends and boluses recorded in `[from, to]`.
    async fn fetch_treatments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Treatments>;

    /// Sensor glucose readings taken in `[from, to]`.
    async fn fetch_glucose(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<GlucoseReading>>;

    /// Short human-readable description, reported by the health endpoint.
    fn describe(&self) -> String;
}
