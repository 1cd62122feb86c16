use anyhow::{anyhow, Context};
use axum::Router;
use tokio::sync::mpsc;
use tracing::{error, info, Level};

use envlog::core::service::snapshot_channel;
use envlog::{Engine, HttpSource};

mod models;
mod routes;
mod state;
mod utils;

use crate::state::app_state::AppState;
use crate::utils::conf_helper::{get_cached_config, init_config_and_bind};

const COMMAND_QUEUE: usize = 32;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Ctrl-C handler failed: {}", e);
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    // === CONFIG + LISTENER ===
    let listener = init_config_and_bind()
        .await
        .context("Critical init failure")?;

    let config = get_cached_config().ok_or_else(|| anyhow!("Config not initialized"))?;

    info!(
        "{} {} initialized on {}:{}, source {}",
        config.name,
        config.version,
        config.connection.ip,
        config.connection.port,
        config.source.base_url
    );

    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
    let (snap_tx, snap_rx) = snapshot_channel();
    let state = AppState::new(snap_rx, cmd_tx);

    let app = Router::new()
        .merge(routes::info_routes::health_routes())
        .merge(routes::data_routes::data_routes(state));

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Engine state lives on this task. The loop ends once the server has
    // shut down and dropped the last command sender.
    let engine = Engine::new(config.engine.clone());
    let source = HttpSource::new(config.source.clone());
    envlog::run(engine, source, cmd_rx, snap_tx).await;

    server.await.context("Server task failed")??;
    info!("Stopped");
    Ok(())
}
