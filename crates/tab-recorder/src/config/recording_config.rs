use crate::config::default_stop_timeout_secs;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tab_recorder_core::SessionSettings;

/// Session behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Seconds to wait for `STOPPED` before forcing the session idle.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
    /// Persist the timer so a restart keeps elapsed time.
    #[serde(default)]
    pub persist_timer_anchor: bool,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout_secs(),
            persist_timer_anchor: false,
        }
    }
}

impl RecordingConfig {
    /// Settings for the coordinator.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            stop_timeout: Duration::from_secs(self.stop_timeout_secs),
            persist_timer_anchor: self.persist_timer_anchor,
        }
    }
}
