use serde::{Deserialize, Serialize};

/// Anchor-based elapsed time accounting.
///
/// Elapsed time is recomputed from the anchor on every read instead of being
/// advanced by a periodic tick, so a suspended process loses no time.
///
/// - Running: `elapsed = accumulated + (now - anchor)`
/// - Frozen: `elapsed = accumulated`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElapsedTimer {
    /// Epoch millis when the current running interval began.
    pub anchor_ms: Option<u64>,
    /// Milliseconds counted before the current running interval.
    pub accumulated_ms: u64,
}

impl ElapsedTimer {
    /// A timer that started running at `now_ms` from zero.
    pub fn started_at(now_ms: u64) -> Self {
        Self {
            anchor_ms: Some(now_ms),
            accumulated_ms: 0,
        }
    }

    /// True while the anchor is set.
    pub fn is_running(&self) -> bool {
        self.anchor_ms.is_some()
    }

    /// Elapsed milliseconds at `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.anchor_ms {
            // A clock that stepped backwards contributes nothing.
            Some(anchor) => self.accumulated_ms + now_ms.saturating_sub(anchor),
            None => self.accumulated_ms,
        }
    }

    /// Whole elapsed seconds at `now_ms`.
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }

    /// Fold the running interval into `accumulated_ms` and clear the anchor.
    ///
    /// No-op when already frozen.
    pub fn freeze(&mut self, now_ms: u64) {
        if self.anchor_ms.is_some() {
            self.accumulated_ms = self.elapsed_ms(now_ms);
            self.anchor_ms = None;
        }
    }

    /// Start a new running interval at `now_ms`.
    ///
    /// No-op when already running.
    pub fn unfreeze(&mut self, now_ms: u64) {
        if self.anchor_ms.is_none() {
            self.anchor_ms = Some(now_ms);
        }
    }
}

/// Format whole seconds as `mm:ss`. Minutes are not rolled into hours.
pub fn format_timer(elapsed_seconds: u64) -> String {
    format!("{:02}:{:02}", elapsed_seconds / 60, elapsed_seconds % 60)
}
