use anyhow::{anyhow, Context};
use std::sync::OnceLock;
use tokio::fs;
use tokio::net::TcpListener;
use tracing::info;

use crate::models::config_model::ViewerConfig;

static CONFIG_CACHE: OnceLock<ViewerConfig> = OnceLock::new();

const DEFAULT_CONFIG_PATH: &str = "envlog.json";
const CONFIG_PATH_ENV: &str = "ENVLOG_CONFIG";

pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub async fn init_config_and_bind() -> anyhow::Result<TcpListener> {
    let file_path = config_path();

    let data = fs::read_to_string(&file_path)
        .await
        .with_context(|| format!("File read error: {file_path}"))?;

    let mut config: ViewerConfig =
        serde_json::from_str(&data).with_context(|| format!("JSON parse error: {file_path}"))?;

    let bind_addr = format!("{}:{}", config.connection.ip, config.connection.port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Bind failed: {bind_addr}"))?;

    // port 0 asks the OS for a free port; report the real one through /info
    let actual_port = listener.local_addr().context("Addr error")?.port();
    config.connection.port = actual_port;

    CONFIG_CACHE
        .set(config)
        .map_err(|_| anyhow!("Config already initialized"))?;

    info!("Config {} loaded, listening on port {}", file_path, actual_port);

    Ok(listener)
}

pub fn get_cached_config() -> Option<&'static ViewerConfig> {
    CONFIG_CACHE.get()
}
