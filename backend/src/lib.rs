//! # ns-insulin
//!
//! Insulin delivery reconciliation over Nightscout data.
//!
//! Given a time window, this crate works out how much insulin a pump actually
//! delivered: scheduled basal from profiles defined in local wall-clock time,
//! replaced by temporary basal overrides and suspends where they apply, plus
//! discrete boluses.
//!
//! ## Architecture
//!
//! - [`models`]: profiles, treatments, glucose readings and query windows
//! - [`parsing`]: raw Nightscout JSON into model values
//! - [`engine`]: the pure reconciliation (interval store, profile timeline, reconciler)
//! - [`source`]: where records come from (`LocalSource`, `NightscoutClient`)
//! - [`services`]: query orchestration, including the widening profile search
//! - [`http`]: Axum-based REST API (feature `http-server`)
//!
//! ## Example
//!
//! ```ignore
//! use ns_insulin::models::DeliveryWindow;
//! use ns_insulin::services::DeliveryService;
//! use ns_insulin::source::{SourceConfig, SourceFactory};
//!
//! let source = SourceFactory::create(&SourceConfig::load())?;
//! let window = DeliveryWindow::new(start, end)?;
//! let report = DeliveryService::new(source.as_ref()).delivery_for(&window).await?;
//! println!("{:.2} U basal, {:.2} U bolus", report.basal_units, report.bolus_units);
//! ```

pub mod engine;
pub mod error;
pub mod models;
pub mod parsing;
pub mod services;
pub mod source;

#[cfg(feature = "http-server")]
pub mod http;

pub use error::{DeliveryError, DeliveryResult};
