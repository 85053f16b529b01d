use std::time::Duration;

/// Time allowed between a stop request and the worker's `Stopped` report
/// before the session is forced idle.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(30);

/// Tunables for the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Deadline for the `Stop` to `Stopped` round trip.
    pub stop_timeout: Duration,
    /// Also persist the timer so a restart keeps elapsed time.
    pub persist_timer_anchor: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            persist_timer_anchor: false,
        }
    }
}
