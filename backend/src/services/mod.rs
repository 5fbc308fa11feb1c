//! Service layer for delivery queries.
//!
//! Services sit between a [`NightscoutSource`](crate::source::NightscoutSource)
//! and the callers (HTTP handlers, tests). They fetch what a query needs and
//! hand immutable snapshots to the engine.

pub mod delivery;
pub mod glucose;

pub use delivery::{DeliveryService, SearchConfig};
pub use glucose::{average_glucose, glucose_summary, GlucoseSummary};
