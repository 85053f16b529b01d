use crate::{protocol::Directive, session::WorkerId};

/// One-shot, best-effort transmission to a worker by identifier, used when
/// no channel is registered or the channel rejects a directive.
///
/// Implementations must not block, queue, or retry.
pub trait FallbackTransport: Send + Sync {
    /// Attempt delivery. `Err` carries a human-readable reason.
    fn send_direct(&self, worker_id: WorkerId, directive: &Directive) -> Result<(), String>;
}

/// Fallback for hosts with no out-of-band path to workers.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardFallback;

impl FallbackTransport for DiscardFallback {
    fn send_direct(&self, _worker_id: WorkerId, _directive: &Directive) -> Result<(), String> {
        Err("no fallback transport available".to_string())
    }
}
