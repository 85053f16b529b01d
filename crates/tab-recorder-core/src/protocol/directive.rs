use crate::session::CaptureToken;

use serde::{Deserialize, Serialize};

/// Instructions sent from the coordinator to a capture worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Directive {
    /// Acquire a capture handle with `token` and start recording.
    StartCapture {
        /// Capture authorization token.
        token: CaptureToken,
    },
    /// Stop recording and save the artifact to the given destination.
    Stop {
        /// Target folder.
        #[serde(default)]
        folder: Option<String>,
        /// Target filename.
        #[serde(default)]
        filename: Option<String>,
    },
    /// Pause the pipeline.
    Pause,
    /// Resume the pipeline.
    Resume,
    /// Mute captured audio.
    Mute,
    /// Unmute captured audio.
    Unmute,
}

impl Directive {
    /// Wire name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::StartCapture { .. } => "START_CAPTURE",
            Directive::Stop { .. } => "STOP",
            Directive::Pause => "PAUSE",
            Directive::Resume => "RESUME",
            Directive::Mute => "MUTE",
            Directive::Unmute => "UNMUTE",
        }
    }
}
