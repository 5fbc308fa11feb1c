//! Insulin delivery reconciliation engine.
//!
//! The engine is a pure computation over three immutable snapshots:
//!
//! ```text
//! BasalProfile[] ──► ProfileTimeline ─┐
//! TempBasal[]    ──► TempBasalSet    ─┼──► compute_delivery(window) ──► DeliveryReport
//! Bolus[]        ──► BolusLedger     ─┘
//! ```
//!
//! Nothing here performs I/O or keeps state between calls, so identical inputs
//! always produce identical reports.

pub mod intervals;
pub mod materializer;
pub mod reconciler;
pub mod report;

pub use intervals::{BolusLedger, TempBasalSet};
pub use materializer::ProfileTimeline;
pub use reconciler::{compute_delivery, DeliveryInputs};
pub use report::{DeliveryReport, HourlyDelivery};
