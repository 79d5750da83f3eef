// =============================================================================
// marketsim — Main Entry Point
// =============================================================================
//
// Starts the simulation engine on a fixed-rate ticker and serves the REST +
// WebSocket API over the engine's shared state. Configuration is loaded from
// `engine_config.json` if present, otherwise built-in defaults apply.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analytics;
mod api;
mod app_state;
mod config;
mod engine;
mod ipo;
mod regime;
mod ring;
mod rng;
mod sectors;
mod scheduler;
mod stock;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::config::EngineConfig;

const CONFIG_PATH: &str = "engine_config.json";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("marketsim starting up");

    let config = EngineConfig::load(CONFIG_PATH);
    info!(
        tick_interval_ms = config.tick_interval_ms,
        bind_addr = %config.bind_addr,
        "engine configuration loaded"
    );

    let state = Arc::new(AppState::new(config.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler_state = state.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler::run(scheduler_state, shutdown_rx).await;
    });

    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind API server");
    info!(addr = %config.bind_addr, "API server listening");

    let server_handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "API server exited with an error");
        }
    });

    info!("marketsim running. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    warn!("shutdown signal received, stopping gracefully");

    let _ = shutdown_tx.send(true);
    let _ = scheduler_handle.await;
    server_handle.abort();

    if let Err(err) = state.engine.read().config.save(CONFIG_PATH) {
        warn!(error = %err, "failed to save engine config on shutdown");
    }

    info!("marketsim shut down complete.");
    Ok(())
}
