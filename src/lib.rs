//! concession-radar -- delivery-exception pattern and trend detection.
//!
//! This crate provides the analysis engine behind the quality dashboard:
//! event cleaning, driver/depot hotspot detection, per-driver trend
//! classification, and the HTTP boundary the dashboard talks to.

pub mod analysis;
pub mod api;
pub mod config;
pub mod detect;
pub mod model;

use anyhow::{Context, Result};

use crate::analysis::AnalysisService;
use crate::config::RadarConfig;

/// Start the HTTP service and block until it stops.
pub async fn serve(config: RadarConfig) -> Result<()> {
    let service = AnalysisService::new(config.detection.clone());
    let app = api::router(api::state::AppState::new(service), &config.server);

    let addr: std::net::SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;

    tracing::info!(%addr, "concession-radar listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
