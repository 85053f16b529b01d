//! Session state machine.
//!
//! Translates commands into session transitions and worker directives.
//! Handlers never fail: delivery drops and store errors are logged, and the
//! in-memory session stays authoritative for the live process.

use crate::{
    CoreResult,
    clock::Clock,
    coordinator::SessionSettings,
    link::{LinkId, LinkRegistry, Teardown, WorkerSender},
    protocol::{Command, CommandReply, Directive, SessionStatus},
    session::{CaptureToken, Destination, DestinationParts, Session, SessionState, WorkerId},
    store::{PersistentStore, SessionMirror},
};

use std::sync::Arc;

use tracing::{debug, info, instrument, trace, warn};

/// Owns the session and the link registry.
pub struct Coordinator {
    session: Session,
    links: LinkRegistry,
    store: Arc<dyn PersistentStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    /// Worker handed the most recent capture token, until its session starts.
    token_worker: Option<WorkerId>,
    /// Worker whose token was refused before its session started.
    failed_worker: Option<WorkerId>,
}

impl Coordinator {
    /// Create a coordinator with an idle session.
    pub fn new(
        links: LinkRegistry,
        store: Arc<dyn PersistentStore>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            session: Session::default(),
            links,
            store,
            clock,
            settings,
            token_worker: None,
            failed_worker: None,
        }
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Worker link registry.
    pub fn links(&self) -> &LinkRegistry {
        &self.links
    }

    /// Recover a session left active by a previous coordinator process.
    ///
    /// Returns `true` when a session was restored. Without timer persistence
    /// the restored session counts elapsed time from zero.
    #[instrument(skip(self))]
    pub async fn restore(&mut self) -> bool {
        let mirror = match SessionMirror::load(self.store.as_ref()).await {
            Ok(mirror) => mirror,
            Err(e) => {
                warn!(error = ?e, "Failed to read session mirror, starting idle");
                return false;
            }
        };

        let Some(worker_id) = mirror.worker_id.filter(|_| mirror.is_restorable()) else {
            debug!("No active session to restore");
            return false;
        };

        let now = self.clock.now_ms();
        self.session
            .begin(worker_id, Destination::from_parts(&mirror.destination), now);

        if self.settings.persist_timer_anchor {
            if let Some(timer) = mirror.timer {
                self.session.timer = timer;
                if !timer.is_running() {
                    self.session.state = SessionState::Paused;
                }
            }
        }

        info!(
            worker_id = %worker_id,
            state = ?self.session.state,
            elapsed_seconds = self.session.elapsed_seconds(now),
            "Session restored"
        );

        true
    }

    /// Register a worker's directive channel.
    pub fn register_worker(&mut self, worker_id: WorkerId, sender: WorkerSender) -> LinkId {
        self.links.register_channel(worker_id, sender)
    }

    /// Drop the channel described by `teardown` if it is still current.
    pub fn worker_disconnected(&mut self, teardown: Teardown) {
        self.links.unregister(teardown.worker_id, teardown.link_id);
    }

    /// Process one command to completion.
    #[instrument(skip(self, command), fields(action = command.name()))]
    pub async fn handle(&mut self, command: Command) -> CommandReply {
        self.expire_stale_stop().await;

        match command {
            Command::StartWithToken { token, worker_id } => {
                self.start_with_token(worker_id, token);
                CommandReply::ack()
            }
            Command::Start {
                worker_id,
                folder,
                filename,
            } => {
                self.start(worker_id, DestinationParts { folder, filename })
                    .await;
                CommandReply::ack()
            }
            Command::ReportChunk { chunk } => {
                if self.session.state.is_active() {
                    trace!(bytes = chunk.as_ref().map_or(0, Vec::len), "Chunk reported");
                } else {
                    debug!("Chunk reported while idle, ignoring");
                }
                CommandReply::ack()
            }
            Command::Stop { folder, filename } => {
                self.stop(DestinationParts { folder, filename }).await;
                CommandReply::ack()
            }
            Command::GetSavePath => CommandReply::SavePath(self.save_path().await),
            Command::Pause => {
                self.pause().await;
                CommandReply::ack()
            }
            Command::Resume => {
                self.resume().await;
                CommandReply::ack()
            }
            Command::MuteAudio => {
                self.forward(Directive::Mute);
                CommandReply::ack()
            }
            Command::UnmuteAudio => {
                self.forward(Directive::Unmute);
                CommandReply::ack()
            }
            Command::GetStatus => CommandReply::Status(self.status()),
            Command::Stopped { path } => {
                self.stopped(path).await;
                CommandReply::ack()
            }
            Command::CaptureFailed { reason } => {
                self.capture_failed(reason).await;
                CommandReply::ack()
            }
        }
    }

    /// Snapshot of the session now.
    pub fn status(&self) -> SessionStatus {
        SessionStatus::snapshot(&self.session, self.clock.now_ms())
    }

    /// Force the session idle if a stop request has outlived the timeout.
    ///
    /// Returns `true` when the session was forced idle.
    pub async fn expire_stale_stop(&mut self) -> bool {
        let Some(requested_at) = self.session.stop_requested_at_ms else {
            return false;
        };

        let waited_ms = self.clock.now_ms().saturating_sub(requested_at);
        if u128::from(waited_ms) < self.settings.stop_timeout.as_millis() {
            return false;
        }

        warn!(
            worker_id = ?self.session.worker_id,
            waited_ms,
            "Worker never reported Stopped, forcing session idle"
        );

        self.session.unclean_stop = true;
        self.session.retire();
        self.clear_mirror().await;

        true
    }

    fn start_with_token(&mut self, worker_id: WorkerId, token: CaptureToken) {
        self.token_worker = Some(worker_id);
        if self.failed_worker == Some(worker_id) {
            self.failed_worker = None;
        }

        if self.links.is_connected(worker_id) {
            self.forward_to(worker_id, Directive::StartCapture { token });
        } else {
            debug!(worker_id = %worker_id, "Worker not connected, holding start handoff");
            self.links.stash_handoff(worker_id, token);
        }
    }

    async fn start(&mut self, worker_id: WorkerId, requested: DestinationParts) {
        // The worker already refused the token this start belongs to.
        if self.failed_worker == Some(worker_id) {
            warn!(
                worker_id = %worker_id,
                last_error = ?self.session.last_error,
                "Start for a worker whose capture failed, staying idle"
            );
            return;
        }

        let destination = Destination::from_parts(&requested);
        let now = self.clock.now_ms();

        if self.session.state.is_active() {
            warn!(
                previous_worker = ?self.session.worker_id,
                "Start received during an active session, replacing it"
            );
        }

        self.session.begin(worker_id, destination.clone(), now);
        self.token_worker = None;
        self.failed_worker = None;

        info!(
            worker_id = %worker_id,
            folder = %destination.folder,
            filename = %destination.filename,
            "Recording started"
        );

        let mut mirror = SessionMirror::for_session(worker_id, &destination);
        if self.settings.persist_timer_anchor {
            mirror.timer = Some(self.session.timer);
        }
        log_store_failure(
            mirror.save(self.store.as_ref()).await,
            "save session mirror",
        );
    }

    async fn pause(&mut self) {
        if self.session.state != SessionState::Recording {
            debug!(state = ?self.session.state, "Pause ignored");
            return;
        }

        let now = self.clock.now_ms();
        self.session.timer.freeze(now);
        self.session.state = SessionState::Paused;

        info!(
            elapsed_seconds = self.session.elapsed_seconds(now),
            "Recording paused"
        );

        self.forward(Directive::Pause);
        self.save_timer().await;
    }

    async fn resume(&mut self) {
        if self.session.state != SessionState::Paused {
            debug!(state = ?self.session.state, "Resume ignored");
            return;
        }

        let now = self.clock.now_ms();
        self.session.timer.unfreeze(now);
        self.session.state = SessionState::Recording;

        info!(
            elapsed_seconds = self.session.elapsed_seconds(now),
            "Recording resumed"
        );

        self.forward(Directive::Resume);
        self.save_timer().await;
    }

    async fn stop(&mut self, explicit: DestinationParts) {
        if let Some(destination) = self.session.destination.as_mut() {
            destination.merge(&explicit);
        }

        // The mirror only matters when the live session is missing something.
        let mirror = if self.session.destination.is_none() || self.session.worker_id.is_none() {
            self.load_mirror().await
        } else {
            None
        };

        let destination = Destination::resolve(
            &explicit,
            self.session.destination.as_ref(),
            mirror.as_ref().map(|m| &m.destination),
        );

        let target = self
            .session
            .worker_id
            .or_else(|| mirror.as_ref().and_then(|m| m.worker_id));

        match target {
            Some(worker_id) => {
                info!(
                    worker_id = %worker_id,
                    path = %destination.artifact_path(),
                    "Stop requested"
                );
                self.forward_to(
                    worker_id,
                    Directive::Stop {
                        folder: Some(destination.folder),
                        filename: Some(destination.filename),
                    },
                );
            }
            None => debug!("Stop requested with no bound worker"),
        }

        if self.session.state.is_active() && self.session.stop_requested_at_ms.is_none() {
            self.session.stop_requested_at_ms = Some(self.clock.now_ms());
        }
    }

    async fn stopped(&mut self, path: Option<String>) {
        info!(
            worker_id = ?self.session.worker_id,
            previous_state = ?self.session.state,
            path = ?path,
            "Worker reported Stopped, session finished"
        );

        self.session.retire();
        self.clear_mirror().await;
    }

    async fn capture_failed(&mut self, reason: String) {
        warn!(
            worker_id = ?self.session.worker_id,
            token_worker = ?self.token_worker,
            %reason,
            "Capture failed"
        );

        self.failed_worker = self.token_worker.take();
        self.session.last_error = Some(reason);
        self.session.retire();
        self.clear_mirror().await;
    }

    async fn save_path(&self) -> Destination {
        let mirror = match self.session.destination {
            Some(_) => None,
            None => self.load_mirror().await,
        };

        Destination::resolve(
            &DestinationParts::default(),
            self.session.destination.as_ref(),
            mirror.as_ref().map(|m| &m.destination),
        )
    }

    fn forward(&mut self, directive: Directive) {
        match self.session.worker_id {
            Some(worker_id) => self.forward_to(worker_id, directive),
            None => debug!(directive = directive.name(), "No bound worker, directive skipped"),
        }
    }

    fn forward_to(&mut self, worker_id: WorkerId, directive: Directive) {
        let name = directive.name();
        match self.links.send(worker_id, directive) {
            Ok(delivered) => {
                debug!(worker_id = %worker_id, directive = name, path = ?delivered.path, "Directive delivered");
            }
            Err(dropped) => {
                // Staleness shows up on the next status poll.
                debug!(worker_id = %worker_id, directive = name, reason = %dropped.reason, "Directive dropped");
            }
        }
    }

    async fn load_mirror(&self) -> Option<SessionMirror> {
        match SessionMirror::load(self.store.as_ref()).await {
            Ok(mirror) => Some(mirror),
            Err(e) => {
                warn!(error = ?e, "Failed to read session mirror");
                None
            }
        }
    }

    async fn save_timer(&self) {
        if self.settings.persist_timer_anchor {
            log_store_failure(
                SessionMirror::save_timer(self.store.as_ref(), &self.session.timer).await,
                "save timer",
            );
        }
    }

    async fn clear_mirror(&self) {
        log_store_failure(
            SessionMirror::clear(self.store.as_ref()).await,
            "clear session mirror",
        );
    }
}

fn log_store_failure(result: CoreResult<()>, operation: &str) {
    if let Err(e) = result {
        warn!(error = ?e, operation, "Persistent store operation failed");
    }
}
