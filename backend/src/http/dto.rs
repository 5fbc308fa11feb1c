//! Data Transfer Objects for the HTTP API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::DeliveryReport;

/// Query parameters for the delivery endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryQuery {
    /// Window start (RFC 3339)
    pub start: String,
    /// Window end (RFC 3339, exclusive)
    pub end: String,
    /// Also report the average glucose over the window
    #[serde(default)]
    pub glucose: bool,
}

/// One hour of the delivery breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDto {
    /// UTC start of the hour
    pub hour: DateTime<Utc>,
    pub basal: f64,
    pub bolus: f64,
    pub percent_of_total: f64,
}

/// Response for a delivery query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub basal_units: f64,
    pub bolus_units: f64,
    pub total_units: f64,
    /// Hours in chronological order
    pub hourly: Vec<HourlyDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_glucose_mmol: Option<f64>,
}

impl From<&DeliveryReport> for DeliveryResponse {
    fn from(report: &DeliveryReport) -> Self {
        Self {
            start: report.window.start(),
            end: report.window.end(),
            basal_units: report.basal_units,
            bolus_units: report.bolus_units,
            total_units: report.total_units(),
            hourly: report
                .hourly
                .iter()
                .map(|(hour, h)| HourlyDto {
                    hour: *hour,
                    basal: h.basal,
                    bolus: h.bolus,
                    percent_of_total: h.percent_of_total,
                })
                .collect(),
            average_glucose_mmol: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the service
    pub status: String,
    /// Version of the API
    pub version: String,
    /// Data source description and reachability
    pub source: String,
}
