use crate::{
    protocol::SessionStatus,
    session::{CaptureToken, Destination, WorkerId},
};

use serde::{Deserialize, Serialize};

/// Commands accepted by the coordinator.
///
/// Most originate from the control surface; `Stopped` and `CaptureFailed`
/// are reports from the capture worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "action",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Command {
    /// Hand a capture token to a worker, now or once it connects.
    StartWithToken {
        /// Capture authorization token.
        token: CaptureToken,
        /// Worker that should start capturing.
        worker_id: WorkerId,
    },
    /// Begin a new session bound to `worker_id`.
    Start {
        /// Worker performing the capture.
        worker_id: WorkerId,
        /// Target folder, default when absent.
        #[serde(default)]
        folder: Option<String>,
        /// Target filename, default when absent.
        #[serde(default)]
        filename: Option<String>,
    },
    /// A media chunk was produced. The coordinator does not keep the bytes.
    ReportChunk {
        /// Raw chunk bytes, if the sender included them.
        #[serde(default)]
        chunk: Option<Vec<u8>>,
    },
    /// Ask the bound worker to stop and emit the artifact.
    Stop {
        /// Folder override.
        #[serde(default)]
        folder: Option<String>,
        /// Filename override.
        #[serde(default)]
        filename: Option<String>,
    },
    /// Query the destination the artifact should be saved to.
    GetSavePath,
    /// Suspend the running session.
    Pause,
    /// Continue a paused session.
    Resume,
    /// Silence captured audio.
    MuteAudio,
    /// Restore captured audio.
    UnmuteAudio,
    /// Query session state and timer.
    GetStatus,
    /// Worker report: artifact emission issued, session finished.
    Stopped {
        /// Path of the issued download; absent when nothing was saved.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<String>,
    },
    /// Worker report: the media pipeline refused to start.
    CaptureFailed {
        /// User-visible reason.
        reason: String,
    },
}

impl Command {
    /// Wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartWithToken { .. } => "START_WITH_TOKEN",
            Command::Start { .. } => "START",
            Command::ReportChunk { .. } => "REPORT_CHUNK",
            Command::Stop { .. } => "STOP",
            Command::GetSavePath => "GET_SAVE_PATH",
            Command::Pause => "PAUSE",
            Command::Resume => "RESUME",
            Command::MuteAudio => "MUTE_AUDIO",
            Command::UnmuteAudio => "UNMUTE_AUDIO",
            Command::GetStatus => "GET_STATUS",
            Command::Stopped { .. } => "STOPPED",
            Command::CaptureFailed { .. } => "CAPTURE_FAILED",
        }
    }
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Always `true`; failures are surfaced through status instead.
    pub ok: bool,
}

/// Reply to a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandReply {
    /// Reply to `GetStatus`.
    Status(SessionStatus),
    /// Reply to `GetSavePath`.
    SavePath(Destination),
    /// Reply to everything else.
    Ack(Ack),
}

impl CommandReply {
    /// The acknowledgement reply.
    pub fn ack() -> Self {
        CommandReply::Ack(Ack { ok: true })
    }
}
