//! Worker directive channel carried over a WebSocket.
//!
//! Each socket registers one directive channel with the coordinator.
//! Directives go out as `directive` frames; worker reports come in as
//! command JSON and are answered with `reply` frames. A `STOPPED` report
//! carrying a path is added to the recording history. Closing the socket
//! drops the channel, which tears down the registration.

use crate::server::ServerState;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use chrono::Utc;
use serde::Serialize;
use tab_recorder_core::{Command, CommandReply, Directive, WorkerId};
use tracing::{debug, error, info, warn};

/// Frame sent from the coordinator to a worker socket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum WorkerFrame {
    /// A directive for the worker.
    Directive(Directive),
    /// The reply to a command the worker sent.
    Reply(CommandReply),
    /// The worker sent something that could not be handled.
    Error { message: String },
}

/// True for the commands a worker may send over its socket.
pub(crate) fn accepts_from_worker(command: &Command) -> bool {
    matches!(
        command,
        Command::Stopped { .. }
            | Command::GetSavePath
            | Command::CaptureFailed { .. }
            | Command::ReportChunk { .. }
    )
}

pub(super) async fn upgrade_handler(
    ws: WebSocketUpgrade,
    Path(worker_id): Path<WorkerId>,
    State(state): State<ServerState>,
) -> Response {
    ws.on_upgrade(move |socket| serve_worker(socket, worker_id, state))
}

async fn serve_worker(mut socket: WebSocket, worker_id: WorkerId, state: ServerState) {
    let mut shutdown_rx = state.shutdown_rx.clone();
    if *shutdown_rx.borrow() {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let mut directives = match state.handle.connect_worker(worker_id).await {
        Ok(directives) => directives,
        Err(e) => {
            error!(worker_id = %worker_id, error = ?e, "Failed to register worker channel");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    info!(worker_id = %worker_id, "Worker socket connected");

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }

            directive = directives.recv() => match directive {
                Some(directive) => {
                    debug!(worker_id = %worker_id, directive = directive.name(), "Forwarding directive");
                    if send_frame(&mut socket, &WorkerFrame::Directive(directive)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },

            message = socket.recv() => match message {
                Some(Ok(Message::Text(text))) => {
                    let frame = handle_report(&state, worker_id, text.as_str()).await;
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    info!(worker_id = %worker_id, "Worker socket closed");
}

async fn handle_report(state: &ServerState, worker_id: WorkerId, text: &str) -> WorkerFrame {
    let command = match serde_json::from_str::<Command>(text) {
        Ok(command) => command,
        Err(e) => {
            warn!(worker_id = %worker_id, error = %e, "Unparseable worker frame");
            return WorkerFrame::Error {
                message: format!("Invalid command: {e}"),
            };
        }
    };

    if !accepts_from_worker(&command) {
        warn!(worker_id = %worker_id, action = command.name(), "Command not allowed from a worker");
        return WorkerFrame::Error {
            message: format!("{} is not a worker command", command.name()),
        };
    }

    let issued = match &command {
        Command::Stopped { path: Some(path) } => Some(path.clone()),
        _ => None,
    };

    match state.handle.execute(command).await {
        Ok(reply) => {
            if let Some(path) = issued {
                match state.history.record(&path, Utc::now()).await {
                    Ok(()) => debug!(worker_id = %worker_id, %path, "Recording added to history"),
                    Err(e) => warn!(worker_id = %worker_id, error = ?e, "Failed to record history"),
                }
            }
            WorkerFrame::Reply(reply)
        }
        Err(e) => WorkerFrame::Error {
            message: e.to_string(),
        },
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &WorkerFrame) -> Result<(), axum::Error> {
    match serde_json::to_string(frame) {
        Ok(payload) => socket.send(Message::Text(payload.into())).await,
        Err(e) => {
            error!(error = %e, "Failed to serialize worker frame");
            Ok(())
        }
    }
}
