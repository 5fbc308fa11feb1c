//! Error types for data source operations.
//!
//! Every fetch failure carries an [`ErrorContext`] saying which operation and
//! collection were involved and whether the fault is worth retrying.

use std::fmt;

use crate::parsing::ParseError;

/// Result type for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Structured context for source errors.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "fetch_profiles")
    pub operation: Option<String>,
    /// The Nightscout collection involved (e.g., "treatments")
    pub collection: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
    /// Whether this error is retryable
    pub retryable: bool,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the collection.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark this error as retryable.
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref collection) = self.collection {
            parts.push(format!("collection={}", collection));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        if self.retryable {
            parts.push("retryable=true".to_string());
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for data source operations
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The server could not be reached. Usually transient.
    #[error("Connection error: {message} {context}")]
    ConnectionError {
        message: String,
        context: ErrorContext,
    },

    /// The request took longer than the configured timeout.
    #[error("Timeout error: {message} {context}")]
    TimeoutError {
        message: String,
        context: ErrorContext,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message} {context}")]
    HttpStatus {
        status: u16,
        message: String,
        context: ErrorContext,
    },

    /// The response body or snapshot could not be decoded.
    #[error("Decode error: {message} {context}")]
    DecodeError {
        message: String,
        context: ErrorContext,
    },

    /// Records were fetched but could not be parsed into model values.
    #[error("Invalid records: {source} {context}")]
    InvalidRecords {
        #[source]
        source: ParseError,
        context: ErrorContext,
    },

    /// Configuration or initialization error.
    #[error("Configuration error: {message} {context}")]
    ConfigurationError {
        message: String,
        context: ErrorContext,
    },
}

impl SourceError {
    /// Create a connection error with context. Connection errors are retryable.
    pub fn connection_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::ConnectionError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create a timeout error with context. Timeouts are retryable.
    pub fn timeout_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::TimeoutError {
            message: message.into(),
            context: context.retryable(),
        }
    }

    /// Create an HTTP status error. 5xx and 429 are retryable.
    pub fn http_status(status: u16, message: impl Into<String>, context: ErrorContext) -> Self {
        let context = if status >= 500 || status == 429 {
            context.retryable()
        } else {
            context
        };
        Self::HttpStatus {
            status,
            message: message.into(),
            context,
        }
    }

    /// Create a decode error with context.
    pub fn decode_with_context(message: impl Into<String>, context: ErrorContext) -> Self {
        Self::DecodeError {
            message: message.into(),
            context,
        }
    }

    /// Wrap a parse error with the fetch that produced the records.
    pub fn parse_with_context(source: ParseError, context: ErrorContext) -> Self {
        Self::InvalidRecords { source, context }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Whether the source answered but its data could not be used.
    pub fn is_data_fault(&self) -> bool {
        matches!(self, Self::InvalidRecords { .. } | Self::DecodeError { .. })
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.context().retryable
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::ConnectionError { context, .. }
            | Self::TimeoutError { context, .. }
            | Self::HttpStatus { context, .. }
            | Self::DecodeError { context, .. }
            | Self::InvalidRecords { context, .. }
            | Self::ConfigurationError { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        match &mut self {
            Self::ConnectionError { context, .. }
            | Self::TimeoutError { context, .. }
            | Self::HttpStatus { context, .. }
            | Self::DecodeError { context, .. }
            | Self::InvalidRecords { context, .. }
            | Self::ConfigurationError { context, .. } => {
                context.operation = Some(operation.into());
            }
        }
        self
    }
}

#[cfg(feature = "nightscout-source")]
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        let context = ErrorContext::default();
        if err.is_timeout() {
            Self::timeout_with_context(err.to_string(), context)
        } else if err.is_connect() || err.is_request() {
            Self::connection_with_context(err.to_string(), context)
        } else if let Some(status) = err.status() {
            Self::http_status(status.as_u16(), err.to_string(), context)
        } else if err.is_decode() {
            Self::decode_with_context(err.to_string(), context)
        } else {
            Self::connection_with_context(err.to_string(), context)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_display() {
        let ctx = ErrorContext::new("fetch_treatments")
            .with_collection("treatments")
            .with_details("attempt=2")
            .retryable();
        assert_eq!(
            ctx.to_string(),
            "[operation=fetch_treatments, collection=treatments, details=attempt=2, retryable=true]"
        );
    }

    #[test]
    fn test_http_status_retryability() {
        assert!(SourceError::http_status(503, "unavailable", ErrorContext::default()).is_retryable());
        assert!(SourceError::http_status(429, "slow down", ErrorContext::default()).is_retryable());
        assert!(!SourceError::http_status(404, "missing", ErrorContext::default()).is_retryable());
        assert!(!SourceError::http_status(401, "unauthorized", ErrorContext::default()).is_retryable());
    }

    #[test]
    fn test_connection_and_timeout_are_retryable() {
        assert!(SourceError::connection_with_context("refused", ErrorContext::default()).is_retryable());
        assert!(SourceError::timeout_with_context("60s", ErrorContext::default()).is_retryable());
        assert!(!SourceError::decode_with_context("bad json", ErrorContext::default()).is_retryable());
        assert!(!SourceError::configuration("no url").is_retryable());
    }

    #[test]
    fn test_with_operation_overrides_context() {
        let err = SourceError::configuration("no url").with_operation("create_source");
        assert_eq!(err.context().operation.as_deref(), Some("create_source"));
    }
}
