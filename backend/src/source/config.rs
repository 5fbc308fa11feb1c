//! Source configuration file support.
//!
//! Configuration is read from an `ns-insulin.toml` file:
//!
//! ```toml
//! [source]
//! type = "nightscout"
//!
//! [nightscout]
//! base_url = "https://my-site.herokuapp.com"
//! api_token = "reader-1234"
//!
//! [search]
//! max_lookback_days = 365
//! ```
//!
//! or, when no file is present, from environment variables.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::error::SourceError;
use super::factory::SourceType;
use crate::services::SearchConfig;

/// Source configuration from file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub nightscout: NightscoutSettings,
    #[serde(default)]
    pub local: LocalSettings,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Source type settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(rename = "type")]
    pub source_type: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            source_type: "local".to_string(),
        }
    }
}

/// Nightscout server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightscoutSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for NightscoutSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: None,
            page_size: default_page_size(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Snapshot file settings for the local source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalSettings {
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_page_size() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl SourceConfig {
    /// Load source configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            SourceError::configuration(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            SourceError::configuration(format!("Failed to parse config file: {}", e))
        })
    }

    /// Load source configuration from the default location.
    ///
    /// Searches for `ns-insulin.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, SourceError> {
        let search_paths = [
            PathBuf::from("ns-insulin.toml"),
            PathBuf::from("backend/ns-insulin.toml"),
            PathBuf::from("../ns-insulin.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(SourceError::configuration(
            "No ns-insulin.toml found in standard locations",
        ))
    }

    /// Build configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `SOURCE_TYPE`: `local` or `nightscout` (default: `nightscout` when
    ///   `NIGHTSCOUT_URL` is set, otherwise `local`)
    /// - `NIGHTSCOUT_URL`: Nightscout base URL
    /// - `NIGHTSCOUT_TOKEN`: API token with read access
    /// - `LOCAL_SNAPSHOT`: JSON snapshot file for the local source
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.source.source_type = SourceType::from_env().to_string();

        if let Ok(url) = env::var("NIGHTSCOUT_URL") {
            config.nightscout.base_url = url;
        }
        config.nightscout.api_token = env::var("NIGHTSCOUT_TOKEN").ok().filter(|t| !t.is_empty());
        config.local.snapshot_path = env::var("LOCAL_SNAPSHOT").ok().map(PathBuf::from);

        config
    }

    /// Configuration file if one is found, otherwise the environment.
    pub fn load() -> Self {
        match Self::from_default_location() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("{}; falling back to environment", e);
                Self::from_env()
            }
        }
    }

    /// Get the source type from configuration.
    pub fn source_type(&self) -> Result<SourceType, SourceError> {
        SourceType::from_str(&self.source.source_type).map_err(SourceError::configuration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_config() {
        let toml = r#"
[source]
type = "local"

[local]
snapshot_path = "data/snapshot.json"
"#;

        let config: SourceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source_type().unwrap(), SourceType::Local);
        assert_eq!(
            config.local.snapshot_path,
            Some(PathBuf::from("data/snapshot.json"))
        );
        assert_eq!(config.search, SearchConfig::default());
    }

    #[test]
    fn test_parse_nightscout_config() {
        let toml = r#"
[source]
type = "nightscout"

[nightscout]
base_url = "https://ns.example.org"
api_token = "reader-abc"
page_size = 500
max_retries = 5
retry_delay_ms = 250

[search]
initial_lookback_days = 7
max_lookback_days = 90
"#;

        let config: SourceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.source_type().unwrap(), SourceType::Nightscout);
        assert_eq!(config.nightscout.base_url, "https://ns.example.org");
        assert_eq!(config.nightscout.api_token.as_deref(), Some("reader-abc"));
        assert_eq!(config.nightscout.page_size, 500);
        assert_eq!(config.nightscout.max_retries, 5);
        assert_eq!(config.nightscout.retry_delay_ms, 250);
        assert_eq!(config.nightscout.request_timeout_secs, 60);
        assert_eq!(config.search.initial_lookback_days, 7);
        assert_eq!(config.search.max_lookback_days, 90);
        assert_eq!(config.search.max_override_minutes, 1440);
    }

    #[test]
    fn test_unknown_source_type_is_rejected() {
        let toml = r#"
[source]
type = "mongodb"
"#;

        let config: SourceConfig = toml::from_str(toml).unwrap();
        assert!(config.source_type().is_err());
    }
}
