//! Marketing Dashboard - Ad spend vs lead and revenue attribution
//!
//! Aggregates spend from the ad platforms with lead and order data from the
//! backend database, joins them on UTM attribution keys and serves CPA and
//! ROAS metrics over a JSON API.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod platforms;
pub mod services;
pub mod state;
pub mod window;

#[cfg(test)]
mod testing;

use api::ApiServer;
use config::AppConfig;
use state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize and run the dashboard service until Ctrl-C
pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketing_dashboard=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Marketing Dashboard...");

    let config = AppConfig::from_env()?;
    tracing::info!(
        "Platforms: {:?}, timezone {}, default range {} days",
        config.dashboard.platforms,
        config.dashboard.timezone,
        config.dashboard.default_range_days
    );

    let state = Arc::new(AppState::new(config)?);
    tracing::info!("Application state initialized");

    let mut server = ApiServer::new(state);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    server.shutdown().await;

    Ok(())
}
