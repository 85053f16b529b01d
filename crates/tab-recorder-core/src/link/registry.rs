//! Worker link registry.
//!
//! Tracks at most one directive channel per worker and buffers the single
//! start handoff that may arrive before its worker connects.

use crate::{
    link::FallbackTransport,
    protocol::Directive,
    session::{CaptureToken, WorkerId},
};

use std::{collections::HashMap, fmt, sync::Arc};

use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Sending half of a worker's directive channel.
pub type WorkerSender = mpsc::Sender<Directive>;

/// Identifies one registration of a worker channel.
///
/// A worker that reconnects gets a new id, so the teardown of its previous
/// channel cannot remove the new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(Uuid);

impl LinkId {
    fn new() -> Self {
        LinkId(Uuid::new_v4())
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification that a registered channel's receiving side closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    /// Worker whose channel closed.
    pub worker_id: WorkerId,
    /// Registration that closed.
    pub link_id: LinkId,
}

/// Start token produced before its worker's channel registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHandoff {
    /// Worker the token is meant for.
    pub worker_id: WorkerId,
    /// Token to deliver as `StartCapture`.
    pub token: CaptureToken,
}

/// How a directive left the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    /// Pushed over the registered channel.
    Channel,
    /// Handed to the fallback transport. Arrival is not guaranteed.
    Fallback,
}

/// A directive was handed off for delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivered {
    /// Target worker.
    pub worker_id: WorkerId,
    /// Route taken.
    pub path: DeliveryPath,
}

/// A directive could not be delivered by any route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    /// Target worker.
    pub worker_id: WorkerId,
    /// The undelivered directive.
    pub directive: Directive,
    /// Why the fallback also failed.
    pub reason: String,
}

/// Result of [`LinkRegistry::send`]. Callers decide whether a drop matters.
pub type SendOutcome = Result<Delivered, Dropped>;

struct WorkerChannel {
    link_id: LinkId,
    sender: WorkerSender,
    /// Dropped with the channel; stops its teardown watcher.
    _retire_tx: Option<oneshot::Sender<()>>,
}

/// Maps worker ids to their directive channels.
pub struct LinkRegistry {
    channels: HashMap<WorkerId, WorkerChannel>,
    pending: Option<PendingHandoff>,
    fallback: Arc<dyn FallbackTransport>,
    teardown_tx: Option<mpsc::UnboundedSender<Teardown>>,
}

impl LinkRegistry {
    /// Create an empty registry using `fallback` for unreachable workers.
    pub fn new(fallback: Arc<dyn FallbackTransport>) -> Self {
        Self {
            channels: HashMap::new(),
            pending: None,
            fallback,
            teardown_tx: None,
        }
    }

    /// Report channel closures on `teardown_tx`.
    ///
    /// Each registered channel then gets a task that waits for its receiver
    /// to drop, so this must be called from within a tokio runtime.
    pub fn with_teardown(mut self, teardown_tx: mpsc::UnboundedSender<Teardown>) -> Self {
        self.teardown_tx = Some(teardown_tx);
        self
    }

    /// Register `sender` as the channel for `worker_id`, replacing any
    /// previous one. A pending handoff for this worker is delivered at once.
    #[instrument(skip(self, sender))]
    pub fn register_channel(&mut self, worker_id: WorkerId, sender: WorkerSender) -> LinkId {
        let link_id = LinkId::new();

        // The watcher's sender clone must not outlive the registration, or a
        // replaced receiver would never observe its channel closing.
        let retire_tx = self.teardown_tx.as_ref().map(|teardown_tx| {
            let (retire_tx, retire_rx) = oneshot::channel::<()>();
            let watched = sender.clone();
            let teardown_tx = teardown_tx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = watched.closed() => {
                        let _ = teardown_tx.send(Teardown { worker_id, link_id });
                    }
                    _ = retire_rx => {}
                }
            });
            retire_tx
        });

        let replaced = self
            .channels
            .insert(
                worker_id,
                WorkerChannel {
                    link_id,
                    sender,
                    _retire_tx: retire_tx,
                },
            )
            .is_some();

        info!(worker_id = %worker_id, link_id = %link_id, replaced, "Worker channel registered");

        let handoff = self
            .pending
            .take_if(|pending| pending.worker_id == worker_id);
        if let Some(handoff) = handoff {
            debug!(worker_id = %worker_id, "Delivering pending start handoff");
            if let Err(dropped) = self.send(
                worker_id,
                Directive::StartCapture {
                    token: handoff.token,
                },
            ) {
                warn!(worker_id = %worker_id, reason = %dropped.reason, "Pending handoff dropped");
            }
        }

        link_id
    }

    /// Remove the channel registered as `link_id`. Returns `false` when the
    /// worker has since re-registered or was never registered.
    #[instrument(skip(self))]
    pub fn unregister(&mut self, worker_id: WorkerId, link_id: LinkId) -> bool {
        match self.channels.get(&worker_id) {
            Some(channel) if channel.link_id == link_id => {
                self.channels.remove(&worker_id);
                info!(worker_id = %worker_id, link_id = %link_id, "Worker channel removed");
                true
            }
            _ => {
                debug!(worker_id = %worker_id, link_id = %link_id, "Stale teardown ignored");
                false
            }
        }
    }

    /// True when `worker_id` has an open channel.
    pub fn is_connected(&self, worker_id: WorkerId) -> bool {
        self.channels
            .get(&worker_id)
            .is_some_and(|channel| !channel.sender.is_closed())
    }

    /// Buffer a start token until `worker_id` registers, superseding any
    /// earlier handoff.
    #[instrument(skip(self, token))]
    pub fn stash_handoff(&mut self, worker_id: WorkerId, token: CaptureToken) {
        if let Some(previous) = self.pending.replace(PendingHandoff { worker_id, token }) {
            debug!(superseded = %previous.worker_id, "Pending handoff superseded");
        }
    }

    /// The buffered handoff, if any.
    pub fn pending_handoff(&self) -> Option<&PendingHandoff> {
        self.pending.as_ref()
    }

    /// Deliver `directive` to `worker_id`.
    ///
    /// Uses the registered channel when possible, otherwise a single
    /// fallback attempt. Nothing is queued or retried.
    pub fn send(&mut self, worker_id: WorkerId, directive: Directive) -> SendOutcome {
        let directive = match self.channels.get(&worker_id) {
            Some(channel) => match channel.sender.try_send(directive) {
                Ok(()) => {
                    return Ok(Delivered {
                        worker_id,
                        path: DeliveryPath::Channel,
                    });
                }
                Err(TrySendError::Full(directive)) => {
                    debug!(worker_id = %worker_id, "Worker channel full, using fallback");
                    directive
                }
                Err(TrySendError::Closed(directive)) => {
                    debug!(worker_id = %worker_id, "Worker channel closed, using fallback");
                    directive
                }
            },
            None => directive,
        };

        match self.fallback.send_direct(worker_id, &directive) {
            Ok(()) => Ok(Delivered {
                worker_id,
                path: DeliveryPath::Fallback,
            }),
            Err(reason) => Err(Dropped {
                worker_id,
                directive,
                reason,
            }),
        }
    }
}
