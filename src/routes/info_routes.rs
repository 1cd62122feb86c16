use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, error};

use crate::utils::conf_helper::get_cached_config;

const INDEX_PATH: &str = "data/index.html";

pub fn health_routes() -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health_check))
        .route("/info", get(info_check))
}

async fn index_page() -> Response {
    fs::read_to_string(INDEX_PATH)
        .await
        .map(Html)
        .map(IntoResponse::into_response)
        .unwrap_or_else(|e| {
            error!("Index page read error: {}", e);
            StatusCode::NOT_FOUND.into_response()
        })
}

pub async fn info_check() -> Response {
    match get_cached_config() {
        Some(config) => {
            debug!("{} info requested", config.name);
            Json(config).into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn health_check() -> Response {
    Json(HealthStatus {
        status: "ok".to_owned(),
    })
    .into_response()
}

#[derive(Serialize)]
pub struct HealthStatus {
    status: String,
}
