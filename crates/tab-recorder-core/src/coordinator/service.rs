//! Single-task coordinator service.
//!
//! Every command and link event is funneled through one channel and handled
//! to completion before the next, so the session is never touched
//! concurrently.

use crate::{
    CoreError, CoreResult,
    clock::Clock,
    coordinator::{Coordinator, SessionSettings},
    link::{FallbackTransport, LinkId, LinkRegistry, Teardown},
    protocol::{Command, CommandReply, Directive, SessionStatus},
    session::WorkerId,
    store::PersistentStore,
};

use std::{panic::Location, sync::Arc, time::Duration};

use error_location::ErrorLocation;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, instrument};

/// Capacity of the command queue into the service.
const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Capacity of each worker's directive channel.
const DIRECTIVE_CHANNEL_CAPACITY: usize = 32;

/// How often the service checks for a stop request that outlived its deadline.
const STOP_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

enum ServiceMessage {
    Command {
        command: Command,
        reply_tx: oneshot::Sender<CommandReply>,
    },
    ConnectWorker {
        worker_id: WorkerId,
        sender: mpsc::Sender<Directive>,
        reply_tx: oneshot::Sender<LinkId>,
    },
}

/// Owns a [`Coordinator`] and runs its message loop.
pub struct CoordinatorService {
    coordinator: Coordinator,
    message_rx: mpsc::Receiver<ServiceMessage>,
    teardown_rx: mpsc::UnboundedReceiver<Teardown>,
}

/// Cloneable handle for talking to a running [`CoordinatorService`].
#[derive(Clone)]
pub struct CoordinatorHandle {
    message_tx: mpsc::Sender<ServiceMessage>,
}

impl CoordinatorService {
    /// Build a service and its handle. Nothing runs until [`Self::run`].
    ///
    /// Must be called within a tokio runtime: channel teardown hooks are
    /// spawned as workers register.
    pub fn new(
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        fallback: Arc<dyn FallbackTransport>,
        settings: SessionSettings,
    ) -> (Self, CoordinatorHandle) {
        let (message_tx, message_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
        let (teardown_tx, teardown_rx) = mpsc::unbounded_channel();

        let links = LinkRegistry::new(fallback).with_teardown(teardown_tx);
        let coordinator = Coordinator::new(links, store, clock, settings);

        (
            Self {
                coordinator,
                message_rx,
                teardown_rx,
            },
            CoordinatorHandle { message_tx },
        )
    }

    /// Restore any persisted session, then process messages until
    /// `shutdown_rx` fires or every handle is dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        self.coordinator.restore().await;

        let mut sweep = tokio::time::interval(STOP_SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!("Coordinator service running");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    info!("Coordinator service shutting down");
                    break;
                }

                message = self.message_rx.recv() => {
                    match message {
                        Some(message) => self.dispatch(message).await,
                        None => {
                            info!("All coordinator handles dropped, shutting down");
                            break;
                        }
                    }
                }

                Some(teardown) = self.teardown_rx.recv() => {
                    self.coordinator.worker_disconnected(teardown);
                }

                _ = sweep.tick() => {
                    self.coordinator.expire_stale_stop().await;
                }
            }
        }
    }

    async fn dispatch(&mut self, message: ServiceMessage) {
        match message {
            ServiceMessage::Command { command, reply_tx } => {
                let reply = self.coordinator.handle(command).await;
                if reply_tx.send(reply).is_err() {
                    debug!("Command caller went away before the reply");
                }
            }
            ServiceMessage::ConnectWorker {
                worker_id,
                sender,
                reply_tx,
            } => {
                let link_id = self.coordinator.register_worker(worker_id, sender);
                if reply_tx.send(link_id).is_err() {
                    error!(worker_id = %worker_id, "Worker connect caller went away");
                }
            }
        }
    }
}

impl CoordinatorHandle {
    /// Send a command and wait for its reply.
    pub async fn execute(&self, command: Command) -> CoreResult<CommandReply> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.message_tx
            .send(ServiceMessage::Command { command, reply_tx })
            .await
            .map_err(|_| CoreError::ServiceUnavailable {
                location: ErrorLocation::from(Location::caller()),
            })?;

        reply_rx.await.map_err(|_| CoreError::ServiceUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Current session status.
    pub async fn status(&self) -> CoreResult<SessionStatus> {
        match self.execute(Command::GetStatus).await? {
            CommandReply::Status(status) => Ok(status),
            other => Err(CoreError::ChannelClosed {
                message: format!("Unexpected reply to GET_STATUS: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Open a directive channel for `worker_id`.
    ///
    /// Dropping the returned receiver tears the channel down.
    pub async fn connect_worker(
        &self,
        worker_id: WorkerId,
    ) -> CoreResult<mpsc::Receiver<Directive>> {
        let (sender, receiver) = mpsc::channel(DIRECTIVE_CHANNEL_CAPACITY);
        let (reply_tx, reply_rx) = oneshot::channel();

        self.message_tx
            .send(ServiceMessage::ConnectWorker {
                worker_id,
                sender,
                reply_tx,
            })
            .await
            .map_err(|_| CoreError::ServiceUnavailable {
                location: ErrorLocation::from(Location::caller()),
            })?;

        let link_id = reply_rx.await.map_err(|_| CoreError::ServiceUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })?;

        debug!(worker_id = %worker_id, link_id = %link_id, "Worker connected");

        Ok(receiver)
    }
}
