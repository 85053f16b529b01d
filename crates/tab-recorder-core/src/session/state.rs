use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the recording session.
///
/// `Idle` is both the initial state and the only terminal state.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No session in progress.
    #[default]
    Idle,
    /// Capturing, timer running.
    Recording,
    /// Capture suspended, timer frozen.
    Paused,
}

impl SessionState {
    /// True for `Recording` and `Paused`.
    pub fn is_active(self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

/// Opaque identifier of a capture worker instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorkerId {
    fn from(id: u64) -> Self {
        WorkerId(id)
    }
}

/// Authorization token that lets a worker acquire a capture handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureToken(pub String);

impl CaptureToken {
    /// Borrow the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaptureToken {
    fn from(token: &str) -> Self {
        CaptureToken(token.to_string())
    }
}
