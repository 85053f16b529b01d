//! HTTP API for control surfaces and the WebSocket endpoint for workers.

mod worker_socket;

pub(crate) use worker_socket::{WorkerFrame, accepts_from_worker};

use crate::AppResult;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use tab_recorder_core::{
    Command, CommandReply, CoordinatorHandle, HistoryEntry, RecordingHistory, SessionStatus,
};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, instrument};

/// Shared by every request handler.
#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) handle: CoordinatorHandle,
    pub(crate) history: RecordingHistory,
    pub(crate) shutdown_rx: watch::Receiver<bool>,
}

pub(crate) fn router(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/commands", post(command_handler))
        .route("/api/status", get(status_handler))
        .route(
            "/api/history",
            get(history_handler).delete(clear_history_handler),
        )
        .route(
            "/ws/workers/{worker_id}",
            get(worker_socket::upgrade_handler),
        )
        .layer(cors)
        .with_state(state)
}

async fn command_handler(
    State(state): State<ServerState>,
    payload: Result<Json<Command>, JsonRejection>,
) -> AppResult<Json<CommandReply>> {
    let Json(command) = payload?;
    execute_command(&state, command).await
}

#[instrument(skip(state, command), fields(action = command.name()))]
async fn execute_command(state: &ServerState, command: Command) -> AppResult<Json<CommandReply>> {
    let reply = state.handle.execute(command).await?;
    Ok(Json(reply))
}

async fn status_handler(State(state): State<ServerState>) -> AppResult<Json<SessionStatus>> {
    Ok(Json(state.handle.status().await?))
}

async fn history_handler(State(state): State<ServerState>) -> AppResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.history.entries().await?))
}

async fn clear_history_handler(State(state): State<ServerState>) -> AppResult<StatusCode> {
    state.history.clear().await?;
    info!("Recording history cleared");
    Ok(StatusCode::NO_CONTENT)
}
