//! ns-insulin HTTP Server Binary
//!
//! Loads the source configuration, builds the data source and serves the
//! delivery API.
//!
//! # Usage
//!
//! ```bash
//! # Replay an exported snapshot
//! SOURCE_TYPE=local LOCAL_SNAPSHOT=snapshot.json cargo run --bin ns-insulin-server
//!
//! # Query a live Nightscout site
//! NIGHTSCOUT_URL=https://my-site.herokuapp.com NIGHTSCOUT_TOKEN=reader-1234 \
//!   cargo run --bin ns-insulin-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `SOURCE_TYPE`, `NIGHTSCOUT_URL`, `NIGHTSCOUT_TOKEN`, `LOCAL_SNAPSHOT`:
//!   used when no `ns-insulin.toml` is found
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ns_insulin::http::{create_router, AppState};
use ns_insulin::source::{SourceConfig, SourceFactory};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting ns-insulin HTTP Server");

    let config = SourceConfig::load();
    let source = SourceFactory::create(&config)?;
    info!("Source initialized: {}", source.describe());

    let state = AppState::new(source).with_search(config.search);
    let app = create_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
