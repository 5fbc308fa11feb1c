//! Application state for the HTTP server.

use std::sync::Arc;

use crate::services::SearchConfig;
use crate::source::NightscoutSource;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Source the delivery queries read from
    pub source: Arc<dyn NightscoutSource>,
    /// Profile search and treatment lookback limits
    pub search: SearchConfig,
}

impl AppState {
    /// Create a new application state with the given source and default limits.
    pub fn new(source: Arc<dyn NightscoutSource>) -> Self {
        Self {
            source,
            search: SearchConfig::default(),
        }
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }
}
