use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use envlog::core::constants::MAX_RANGE_M;
use envlog::{handle_ws_stream, AggregateOptions, Command, Series, ViewOptions};

use crate::state::app_state::AppState;
use crate::utils::conf_helper::get_cached_config;

#[derive(Serialize, Debug)]
pub struct Accepted {
    pub queued: bool,
}

/// =======================
/// ROUTER
/// =======================

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/snapshot", get(snapshot))
        .route("/view", post(set_view))
        .route("/options", post(set_options))
        .route("/stream/{series}", get(ws_stream))
        .with_state(state)
}

/// =======================
/// HANDLERS
/// =======================

async fn snapshot(State(state): State<AppState>) -> Response {
    let current = state.snapshots.borrow().clone();
    match current {
        Some(snap) => Json(snap.as_ref()).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn enqueue(state: &AppState, command: Command) -> Response {
    match state.commands.send(command).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(Accepted { queued: true })).into_response(),
        Err(e) => {
            error!("Engine command channel closed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
    }
}

async fn set_view(State(state): State<AppState>, Json(view): Json<ViewOptions>) -> Response {
    debug!("View request: {:?}", view);
    let max_range = get_cached_config().map_or(MAX_RANGE_M, |c| c.engine.max_range_minutes);
    if !(1..=max_range).contains(&view.range_minutes) {
        warn!("Rejected view with range {}", view.range_minutes);
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }
    enqueue(&state, Command::SetView(view)).await
}

async fn set_options(
    State(state): State<AppState>,
    Json(options): Json<AggregateOptions>,
) -> Response {
    debug!("Options request: {:?}", options);
    enqueue(&state, Command::SetOptions(options)).await
}

async fn ws_stream(
    State(state): State<AppState>,
    Path(series): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let series: Series = match series.parse() {
        Ok(s) => s,
        Err(e) => {
            error!("{}", e);
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let current = state.snapshots.borrow().clone();
    let Some(snapshot) = current else {
        return StatusCode::NO_CONTENT.into_response();
    };

    ws.on_upgrade(move |socket| handle_ws_stream(socket, snapshot, series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use envlog::core::service::snapshot_channel;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_set_view_range_limits() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(4);
        let (_snap_tx, snap_rx) = snapshot_channel();
        let state = AppState::new(snap_rx, cmd_tx);

        for range in [0, -5, 1_000_000_000, MAX_RANGE_M + 1] {
            let res = set_view(State(state.clone()), Json(ViewOptions::latest(range))).await;
            assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert!(cmd_rx.try_recv().is_err());

        let res = set_view(State(state), Json(ViewOptions::fixed(0, MAX_RANGE_M))).await;
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert!(matches!(
            cmd_rx.try_recv(),
            Ok(Command::SetView(v)) if v.range_minutes == MAX_RANGE_M
        ));
    }
}
