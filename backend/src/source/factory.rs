//! Source factory for dependency injection.
//!
//! Builds the [`NightscoutSource`] named by a [`SourceConfig`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::config::SourceConfig;
use super::error::{SourceError, SourceResult};
#[cfg(feature = "local-source")]
use super::local::LocalSource;
#[cfg(feature = "nightscout-source")]
use super::nightscout::{NightscoutClient, NightscoutClientConfig};
use super::NightscoutSource;

/// Source type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    /// In-memory snapshot
    Local,
    /// Nightscout REST API
    Nightscout,
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "snapshot" => Ok(Self::Local),
            "nightscout" | "ns" => Ok(Self::Nightscout),
            _ => Err(format!("Unknown source type: {}", s)),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Nightscout => f.write_str("nightscout"),
        }
    }
}

impl SourceType {
    /// Get source type from environment variables.
    ///
    /// Reads `SOURCE_TYPE`. Defaults to Nightscout if `NIGHTSCOUT_URL` is set,
    /// otherwise Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("SOURCE_TYPE") {
            return val.parse().unwrap_or(Self::Local);
        }

        if std::env::var("NIGHTSCOUT_URL").is_ok() {
            Self::Nightscout
        } else {
            Self::Local
        }
    }
}

/// Factory for creating source instances.
///
/// # Example
/// ```ignore
/// use ns_insulin::source::{SourceConfig, SourceFactory};
///
/// let config = SourceConfig::load();
/// let source = SourceFactory::create(&config)?;
/// ```
pub struct SourceFactory;

impl SourceFactory {
    /// Create the source described by `config`.
    pub fn create(config: &SourceConfig) -> SourceResult<Arc<dyn NightscoutSource>> {
        let source_type = config
            .source_type()
            .map_err(|e| e.with_operation("create_source"))?;

        match source_type {
            SourceType::Local => {
                #[cfg(feature = "local-source")]
                {
                    let source = match &config.local.snapshot_path {
                        Some(path) => LocalSource::from_snapshot_file(path)?,
                        None => LocalSource::new(),
                    };
                    Ok(Arc::new(source) as Arc<dyn NightscoutSource>)
                }
                #[cfg(not(feature = "local-source"))]
                {
                    Err(SourceError::configuration("Local source feature not enabled"))
                }
            }
            SourceType::Nightscout => {
                #[cfg(feature = "nightscout-source")]
                {
                    if config.nightscout.base_url.trim().is_empty() {
                        return Err(SourceError::configuration(
                            "Nightscout source requires 'nightscout.base_url' (or NIGHTSCOUT_URL)",
                        ));
                    }
                    let client_config = NightscoutClientConfig::from(&config.nightscout);
                    let client = NightscoutClient::new(client_config)?;
                    Ok(Arc::new(client) as Arc<dyn NightscoutSource>)
                }
                #[cfg(not(feature = "nightscout-source"))]
                {
                    Err(SourceError::configuration(
                        "Nightscout source feature not enabled",
                    ))
                }
            }
        }
    }

    /// Create an empty in-memory source.
    #[cfg(feature = "local-source")]
    pub fn create_local() -> Arc<dyn NightscoutSource> {
        Arc::new(LocalSource::new())
    }

    /// Create source from environment configuration.
    pub fn from_env() -> SourceResult<Arc<dyn NightscoutSource>> {
        Self::create(&SourceConfig::from_env())
    }

    /// Create source from a TOML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(
        config_path: P,
    ) -> SourceResult<Arc<dyn NightscoutSource>> {
        let config = SourceConfig::from_file(config_path)?;
        Self::create(&config)
    }
}
