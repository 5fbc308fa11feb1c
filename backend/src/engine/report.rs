use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::DeliveryWindow;

/// Insulin delivered during one UTC clock hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyDelivery {
    pub basal: f64,
    pub bolus: f64,
    /// Share of the whole window's delivery, 0–100.
    pub percent_of_total: f64,
}

impl HourlyDelivery {
    pub fn total(&self) -> f64 {
        self.basal + self.bolus
    }
}

/// Result of reconciling one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReport {
    pub window: DeliveryWindow,
    pub basal_units: f64,
    pub bolus_units: f64,
    /// Keyed by the start of each UTC hour that saw any delivery step.
    pub hourly: BTreeMap<DateTime<Utc>, HourlyDelivery>,
}

impl DeliveryReport {
    pub fn empty(window: DeliveryWindow) -> Self {
        Self {
            window,
            basal_units: 0.0,
            bolus_units: 0.0,
            hourly: BTreeMap::new(),
        }
    }

    pub fn total_units(&self) -> f64 {
        self.basal_units + self.bolus_units
    }
}
