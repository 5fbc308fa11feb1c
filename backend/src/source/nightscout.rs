//! Nightscout REST API source.
//!
//! Reads the v1 API (`/api/v1/{collection}.json`). The server caps each
//! response at `count` records and returns them newest first, so a range is
//! read page by page, moving the inclusive upper bound down to the oldest
//! record seen until a short page comes back. Consecutive pages overlap at
//! that timestamp and records already read are dropped.
//!
//! Transient failures (connection refused, timeouts, HTTP 5xx and 429) are
//! retried up to `max_retries` times with a doubling delay.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info, warn};
use serde_json::Value;

use super::config::NightscoutSettings;
use super::error::{ErrorContext, SourceError, SourceResult};
use super::{Collection, NightscoutSource};
use crate::models::{BasalProfile, GlucoseReading, Treatments};
use crate::parsing::{parse_glucose, parse_profiles, parse_timestamp, parse_treatments};

/// Connection settings for [`NightscoutClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct NightscoutClientConfig {
    /// Site root, e.g. `https://my-site.herokuapp.com`
    pub base_url: String,
    /// Token with read access, sent as the `token` query parameter
    pub api_token: Option<String>,
    /// Records requested per page
    pub page_size: usize,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay (doubles with each retry)
    pub retry_delay: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl NightscoutClientConfig {
    /// Create a configuration for `base_url` with default limits.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::from(&NightscoutSettings {
            base_url: base_url.into(),
            ..Default::default()
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

impl From<&NightscoutSettings> for NightscoutClientConfig {
    fn from(settings: &NightscoutSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
            page_size: settings.page_size.max(1),
            max_retries: settings.max_retries,
            retry_delay: Duration::from_millis(settings.retry_delay_ms),
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

/// Nightscout REST client.
#[derive(Debug, Clone)]
pub struct NightscoutClient {
    http: reqwest::Client,
    config: NightscoutClientConfig,
}

impl NightscoutClient {
    pub fn new(config: NightscoutClientConfig) -> SourceResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "Nightscout client for {} (page size {}, {} retries)",
            config.base_url, config.page_size, config.max_retries
        );
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &NightscoutClientConfig {
        &self.config
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/api/v1/{}.json", self.config.base_url, collection.name())
    }

    fn page_query(&self, collection: Collection, from: &str, to: &str) -> Vec<(String, String)> {
        let field = collection.timestamp_field();
        let mut query = vec![
            (format!("find[{}][$gte]", field), from.to_string()),
            (format!("find[{}][$lte]", field), to.to_string()),
        ];
        query.push(("count".to_string(), self.config.page_size.to_string()));
        if let Some(token) = &self.config.api_token {
            query.push(("token".to_string(), token.clone()));
        }
        query
    }

    /// Fetch every raw record of `collection` whose timestamp lies in `[from, to]`.
    pub async fn fetch_records(
        &self,
        collection: Collection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<Value>> {
        let from = format_bound(from);
        let mut upper = format_bound(to);
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut pages = 0usize;

        loop {
            let query = self.page_query(collection, &from, &upper);
            let page = self.get_page(collection, &query).await?;
            pages += 1;
            let page_len = page.len();

            let oldest = oldest_timestamp(&page, collection.timestamp_field());
            records.extend(page.into_iter().filter(|record| seen.insert(record_key(record))));

            if page_len < self.config.page_size {
                break;
            }
            let Some(oldest) = oldest else {
                warn!(
                    "Full page of {} has no readable '{}'; stopping pagination",
                    collection,
                    collection.timestamp_field()
                );
                break;
            };
            if oldest == upper {
                warn!(
                    "More than {} {} records share '{}' = {}; stopping pagination",
                    self.config.page_size,
                    collection,
                    collection.timestamp_field(),
                    oldest
                );
                break;
            }
            upper = oldest;
        }

        debug!(
            "Fetched {} {} records in {} pages",
            records.len(),
            collection,
            pages
        );
        Ok(records)
    }

    /// GET one page, retrying transient failures with a doubling delay.
    async fn get_page(
        &self,
        collection: Collection,
        query: &[(String, String)],
    ) -> SourceResult<Vec<Value>> {
        let max_retries = self.config.max_retries;
        let mut retry_delay = self.config.retry_delay;
        let mut attempt = 0u32;

        loop {
            match self.try_get_page(collection, query, attempt).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    warn!("{}; retrying in {:?}", e, retry_delay);
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get_page(
        &self,
        collection: Collection,
        query: &[(String, String)],
        attempt: u32,
    ) -> SourceResult<Vec<Value>> {
        let context = || {
            ErrorContext::new("fetch_page")
                .with_collection(collection.name())
                .with_details(format!("attempt={}", attempt + 1))
        };

        let response = self
            .http
            .get(self.collection_url(collection))
            .query(query)
            .send()
            .await
            .map_err(|e| with_context(SourceError::from(e), context()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::http_status(
                status.as_u16(),
                body.chars().take(200).collect::<String>(),
                context(),
            ));
        }

        response.json::<Vec<Value>>().await.map_err(|e| {
            SourceError::decode_with_context(e.to_string(), context())
        })
    }
}

/// Replace the context of a converted transport error, keeping its retryability.
fn with_context(err: SourceError, context: ErrorContext) -> SourceError {
    let retryable = err.is_retryable();
    let context = if retryable { context.retryable() } else { context };
    match err {
        SourceError::ConnectionError { message, .. } => SourceError::ConnectionError { message, context },
        SourceError::TimeoutError { message, .. } => SourceError::TimeoutError { message, context },
        SourceError::HttpStatus { status, message, .. } => {
            SourceError::HttpStatus { status, message, context }
        }
        SourceError::DecodeError { message, .. } => SourceError::DecodeError { message, context },
        SourceError::InvalidRecords { source, .. } => SourceError::InvalidRecords { source, context },
        SourceError::ConfigurationError { message, .. } => {
            SourceError::ConfigurationError { message, context }
        }
    }
}

fn format_bound(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Raw timestamp of the oldest record on a page, as the server wrote it.
fn oldest_timestamp(page: &[Value], field: &str) -> Option<String> {
    page.iter()
        .filter_map(|record| record.get(field)?.as_str())
        .filter_map(|raw| parse_timestamp(raw).ok().map(|t| (t, raw)))
        .min_by_key(|(t, _)| *t)
        .map(|(_, raw)| raw.to_string())
}

/// Identity of a record across overlapping pages: its `_id`, else the whole record.
fn record_key(record: &Value) -> String {
    match record.get("_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => record.to_string(),
    }
}

fn fetch_context(operation: &str, collection: Collection) -> ErrorContext {
    ErrorContext::new(operation).with_collection(collection.name())
}

#[async_trait]
impl NightscoutSource for NightscoutClient {
    async fn health_check(&self) -> SourceResult<bool> {
        let mut request = self
            .http
            .get(format!("{}/api/v1/status.json", self.config.base_url));
        if let Some(token) = &self.config.api_token {
            request = request.query(&[("token", token)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| with_context(SourceError::from(e), ErrorContext::new("health_check")))?;
        Ok(response.status().is_success())
    }

    async fn fetch_profiles(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<BasalProfile>> {
        let records = self.fetch_records(Collection::Profiles, from, to).await?;
        parse_profiles(records).map_err(|e| {
            SourceError::parse_with_context(e, fetch_context("fetch_profiles", Collection::Profiles))
        })
    }

    async fn fetch_treatments(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Treatments> {
        let records = self.fetch_records(Collection::Treatments, from, to).await?;
        parse_treatments(records).map_err(|e| {
            SourceError::parse_with_context(
                e,
                fetch_context("fetch_treatments", Collection::Treatments),
            )
        })
    }

    async fn fetch_glucose(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SourceResult<Vec<GlucoseReading>> {
        let records = self.fetch_records(Collection::Entries, from, to).await?;
        parse_glucose(records).map_err(|e| {
            SourceError::parse_with_context(e, fetch_context("fetch_glucose", Collection::Entries))
        })
    }

    fn describe(&self) -> String {
        format!("nightscout ({})", self.config.base_url)
    }
}
