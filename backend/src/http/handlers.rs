//! HTTP handlers for the REST API.
//!
//! Each handler parses its request, delegates to the service layer and maps
//! the result into a DTO.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};

use super::dto::{DeliveryQuery, DeliveryResponse, HealthResponse};
use super::error::AppError;
use super::state::AppState;
use crate::models::DeliveryWindow;
use crate::parsing::parse_timestamp;
use crate::services::{glucose_summary, DeliveryService};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// GET /health
///
/// Health check endpoint to verify the service is running and the source is reachable.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let reachability = match state.source.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        source: format!("{}: {}", state.source.describe(), reachability),
    }))
}

/// GET /v1/delivery?start=..&end=..[&glucose=true]
///
/// Basal and bolus insulin delivered over `[start, end)` with an hourly breakdown.
pub async fn get_delivery(
    State(state): State<AppState>,
    Query(query): Query<DeliveryQuery>,
) -> HandlerResult<DeliveryResponse> {
    let start = parse_bound("start", &query.start)?;
    let end = parse_bound("end", &query.end)?;
    let window = DeliveryWindow::new(start, end)?;

    let service = DeliveryService::new(state.source.as_ref()).with_search(state.search);
    let report = service.delivery_for(&window).await?;

    let mut response = DeliveryResponse::from(&report);
    if query.glucose {
        let summary = glucose_summary(state.source.as_ref(), &window).await?;
        response.average_glucose_mmol = summary.average_mmol_per_l;
    }

    Ok(Json(response))
}

fn parse_bound(name: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(raw).map_err(|e| AppError::BadRequest(format!("Invalid '{}': {}", name, e)))
}
