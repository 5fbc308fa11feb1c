//! HTTP server module.
//!
//! Exposes delivery queries as a small REST API for the reporting UI.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  HTTP Layer (axum handlers)                               │
//! │  - Query parsing and window validation                    │
//! │  - CORS, compression, error mapping                       │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Service Layer (services::delivery, services::glucose)    │
//! └───────────────────┬──────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼──────────────────────────────────────┐
//! │  Source Layer (source::NightscoutSource)                  │
//! │  - LocalSource / NightscoutClient                         │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`
//! - `GET /v1/delivery?start=<RFC 3339>&end=<RFC 3339>[&glucose=true]`

pub mod dto;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::create_router;
pub use state::AppState;
