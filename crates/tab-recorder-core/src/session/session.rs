use crate::session::{Destination, ElapsedTimer, SessionState, WorkerId};

/// The single recording session owned by a coordinator.
///
/// The session refers to its worker only by [`WorkerId`]; channel handles
/// live exclusively in the link registry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Session {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Worker bound to this session, `None` when idle.
    pub worker_id: Option<WorkerId>,
    /// Destination of the eventual artifact, `None` when idle.
    pub destination: Option<Destination>,
    /// Elapsed time accounting.
    pub timer: ElapsedTimer,
    /// Epoch millis of the first stop request awaiting a `Stopped` report.
    pub stop_requested_at_ms: Option<u64>,
    /// Set when the session was forced idle without a `Stopped` report.
    pub unclean_stop: bool,
    /// Last user-visible error.
    pub last_error: Option<String>,
}

impl Session {
    /// Begin a fresh recording bound to `worker_id`.
    ///
    /// Discards everything left over from any previous session.
    pub fn begin(&mut self, worker_id: WorkerId, destination: Destination, now_ms: u64) {
        *self = Session {
            state: SessionState::Recording,
            worker_id: Some(worker_id),
            destination: Some(destination),
            timer: ElapsedTimer::started_at(now_ms),
            ..Session::default()
        };
    }

    /// Return to idle. Diagnostics (`unclean_stop`, `last_error`) survive
    /// until the next [`Session::begin`].
    pub fn retire(&mut self) {
        *self = Session {
            unclean_stop: self.unclean_stop,
            last_error: self.last_error.take(),
            ..Session::default()
        };
    }

    /// Elapsed milliseconds; zero when idle.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.state {
            SessionState::Idle => 0,
            SessionState::Recording | SessionState::Paused => self.timer.elapsed_ms(now_ms),
        }
    }

    /// Whole elapsed seconds; zero when idle.
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        self.elapsed_ms(now_ms) / 1000
    }
}
