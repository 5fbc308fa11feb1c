//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Delivery query error
    Delivery(DeliveryError),
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ApiError) {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg.clone()))
            }
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::Delivery(e) => {
                let msg = e.to_string();
                match e {
                    DeliveryError::InvalidWindow { .. } => {
                        (StatusCode::BAD_REQUEST, ApiError::new("INVALID_WINDOW", msg))
                    }
                    DeliveryError::CoverageFault { .. } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        ApiError::new("COVERAGE_FAULT", msg),
                    ),
                    DeliveryError::MissingRate { .. } => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        ApiError::new("MISSING_RATE", msg),
                    ),
                    DeliveryError::Parse(_) => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        ApiError::new("INVALID_DATA", msg),
                    ),
                    DeliveryError::Source(source) if source.is_data_fault() => (
                        StatusCode::UNPROCESSABLE_ENTITY,
                        ApiError::new("INVALID_DATA", msg),
                    ),
                    DeliveryError::Source(source) => {
                        let error = ApiError::new("SOURCE_ERROR", msg);
                        let error = if source.is_retryable() {
                            error.with_details("transient; retries exhausted")
                        } else {
                            error
                        };
                        (StatusCode::BAD_GATEWAY, error)
                    }
                }
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::Delivery(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::source::{ErrorContext, SourceError};

    fn status_of(err: DeliveryError) -> StatusCode {
        AppError::from(err).status_and_body().0
    }

    #[test]
    fn test_delivery_errors_map_to_status() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        assert_eq!(
            status_of(DeliveryError::InvalidWindow { start: t, end: t }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(DeliveryError::CoverageFault { required: t, searched_from: t }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DeliveryError::MissingRate { at: t }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(DeliveryError::Source(SourceError::http_status(
                503,
                "down",
                ErrorContext::default()
            ))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(DeliveryError::Source(SourceError::decode_with_context(
                "not json",
                ErrorContext::default()
            ))),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_bad_request_body() {
        let (status, body) = AppError::BadRequest("missing start".to_string()).status_and_body();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "BAD_REQUEST");
        assert!(body.details.is_none());
    }
}
