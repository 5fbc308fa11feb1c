//! Error types for delivery queries.
//!
//! Every fault a delivery query can hit ends up as a [`DeliveryError`]. Faults
//! raised while fetching or verifying coverage abort the whole query; the
//! reconciliation math itself only fails on incomplete data.

use chrono::{DateTime, Utc};

use crate::parsing::ParseError;
use crate::source::SourceError;

/// Result type for delivery queries.
pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Error type for delivery queries.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The requested window does not end after it starts.
    #[error("Invalid window: end {end} is not after start {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// No basal profile could be found that is in force at the window start.
    #[error("No basal profile covers {required} (searched back to {searched_from})")]
    CoverageFault {
        required: DateTime<Utc>,
        searched_from: DateTime<Utc>,
    },

    /// Neither a temp basal nor a profile defines the rate at this instant.
    #[error("No basal rate is defined at {at}")]
    MissingRate { at: DateTime<Utc> },

    /// Raw records could not be turned into model values.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The data source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl DeliveryError {
    /// Whether the fault comes from bad user input rather than bad data.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidWindow { .. })
    }

    /// Whether the fault means the fetched data is incomplete or malformed.
    pub fn is_data_fault(&self) -> bool {
        match self {
            Self::CoverageFault { .. } | Self::MissingRate { .. } | Self::Parse(_) => true,
            Self::Source(err) => err.is_data_fault(),
            Self::InvalidWindow { .. } => false,
        }
    }
}
