use anyhow::Context;
use tracing::{info, warn};

use duel_core::logging::{init_tracing, TracingConfig};
use duel_server::{api, storage, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("invalid server configuration")?;

    init_tracing(&TracingConfig::with_level(config.log_level));
    info!(
        port = config.api_port,
        storage = ?config.storage,
        seed_demo_data = config.seed_demo_data,
        "Starting Wizard Duel server"
    );

    let storage = storage::init_storage(&config)
        .await
        .context("failed to initialize storage")?;

    api::start_api_server(storage, config.api_port, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("API server error: {e}"))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
