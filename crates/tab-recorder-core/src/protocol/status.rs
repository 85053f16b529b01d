use crate::session::{Session, SessionState, format_timer};

use serde::{Deserialize, Serialize};

/// Snapshot returned by `GetStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Lifecycle state.
    pub state: SessionState,
    /// Elapsed time as `mm:ss`.
    pub timer: String,
    /// Whole elapsed seconds.
    pub elapsed_seconds: u64,
    /// Destination folder of the active session.
    pub folder: Option<String>,
    /// Destination filename of the active session.
    pub filename: Option<String>,
    /// The last session was forced idle without a `Stopped` report.
    #[serde(default)]
    pub unclean_stop: bool,
    /// Last user-visible error.
    #[serde(default)]
    pub last_error: Option<String>,
}

impl SessionStatus {
    /// Snapshot `session` at `now_ms`.
    pub fn snapshot(session: &Session, now_ms: u64) -> Self {
        let elapsed_seconds = session.elapsed_seconds(now_ms);
        Self {
            state: session.state,
            timer: format_timer(elapsed_seconds),
            elapsed_seconds,
            folder: session.destination.as_ref().map(|d| d.folder.clone()),
            filename: session.destination.as_ref().map(|d| d.filename.clone()),
            unclean_stop: session.unclean_stop,
            last_error: session.last_error.clone(),
        }
    }
}
