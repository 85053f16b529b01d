//! Capture worker controller.
//!
//! Drives one media pipeline per session from coordinator directives, keeps
//! its directive channel alive while capture is in progress, and emits the
//! artifact when the pipeline finishes.

use crate::{
    CoreError, CoreResult,
    protocol::Directive,
    session::{CaptureToken, Destination, DestinationParts, WorkerId},
    worker::{
        Artifact, CoordinatorPort, DownloadAdapter, DownloadRequest, MediaPipeline,
        RecordingHistory,
    },
};

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Delay before reopening a directive channel that closed mid-capture.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_millis(500);

/// Tunables for the capture worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Delay between reconnection attempts.
    pub reconnect_backoff: Duration,
    /// Ask the download adapter to let the user pick the location.
    pub prompt_for_location: bool,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            prompt_for_location: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// No capture started yet.
    Idle,
    Capturing,
    /// Stop requested, waiting for the artifact.
    Stopping,
    Finished,
}

impl Phase {
    fn is_active(self) -> bool {
        matches!(self, Phase::Capturing | Phase::Stopping)
    }
}

/// Translates directives into pipeline calls for a single worker instance.
pub struct CaptureWorkerController {
    worker_id: WorkerId,
    pipeline: Box<dyn MediaPipeline>,
    download: Arc<dyn DownloadAdapter>,
    port: Arc<dyn CoordinatorPort>,
    history: Option<RecordingHistory>,
    settings: WorkerSettings,
    phase: Phase,
    destination: DestinationParts,
    muted: bool,
    artifact_tx: mpsc::Sender<Artifact>,
    artifact_rx: mpsc::Receiver<Artifact>,
}

impl CaptureWorkerController {
    /// Create a controller for `worker_id`.
    pub fn new(
        worker_id: WorkerId,
        pipeline: Box<dyn MediaPipeline>,
        download: Arc<dyn DownloadAdapter>,
        port: Arc<dyn CoordinatorPort>,
        settings: WorkerSettings,
    ) -> Self {
        let (artifact_tx, artifact_rx) = mpsc::channel(1);
        Self {
            worker_id,
            pipeline,
            download,
            port,
            history: None,
            settings,
            phase: Phase::Idle,
            destination: DestinationParts::default(),
            muted: false,
            artifact_tx,
            artifact_rx,
        }
    }

    /// Record every issued download in `history`.
    pub fn with_history(mut self, history: RecordingHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// Connect to the coordinator and process directives.
    ///
    /// Returns after the artifact has been emitted and `Stopped` reported, or
    /// when the channel closes while no capture is in progress. A channel
    /// lost mid-capture is reopened after the reconnect backoff.
    ///
    /// # Errors
    ///
    /// Returns the connection error if the first connection fails before
    /// any capture has started.
    #[instrument(skip(self), fields(worker_id = %self.worker_id))]
    pub async fn run(mut self) -> CoreResult<()> {
        loop {
            let mut directives = match self.port.connect(self.worker_id).await {
                Ok(directives) => directives,
                Err(e) if self.phase.is_active() => {
                    warn!(error = ?e, "Reconnect failed, retrying");
                    tokio::time::sleep(self.settings.reconnect_backoff).await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!("Connected to coordinator");

            loop {
                tokio::select! {
                    biased;

                    Some(artifact) = self.artifact_rx.recv() => {
                        self.finish(artifact).await;
                        return Ok(());
                    }

                    directive = directives.recv() => match directive {
                        Some(directive) => self.handle_directive(directive).await,
                        None => break,
                    },
                }
            }

            // The pipeline may have finished just as the channel closed.
            if let Ok(artifact) = self.artifact_rx.try_recv() {
                self.finish(artifact).await;
                return Ok(());
            }

            if !self.phase.is_active() {
                info!("Coordinator channel closed, worker exiting");
                return Ok(());
            }

            warn!(
                backoff_ms = self.settings.reconnect_backoff.as_millis(),
                "Coordinator channel lost during capture, reconnecting"
            );
            tokio::time::sleep(self.settings.reconnect_backoff).await;
        }
    }

    /// Apply one directive.
    #[instrument(skip(self, directive), fields(directive = directive.name()))]
    pub async fn handle_directive(&mut self, directive: Directive) {
        match directive {
            Directive::StartCapture { token } => self.start(token).await,
            Directive::Stop { folder, filename } => self.stop(folder, filename),
            Directive::Pause => {
                if self.phase == Phase::Capturing {
                    self.pipeline.pause();
                }
            }
            Directive::Resume => {
                if self.phase == Phase::Capturing {
                    self.pipeline.resume();
                }
            }
            Directive::Mute => self.set_muted(true),
            Directive::Unmute => self.set_muted(false),
        }
    }

    async fn start(&mut self, token: CaptureToken) {
        if self.phase != Phase::Idle {
            warn!(phase = ?self.phase, "Capture already started, ignoring StartCapture");
            return;
        }

        match self.pipeline.start(&token, self.artifact_tx.clone()).await {
            Ok(()) => {
                self.phase = Phase::Capturing;
                if self.muted {
                    self.pipeline.set_muted(true);
                }
                info!("Capture started");
            }
            Err(e) => {
                error!(error = ?e, "Capture could not start");
                let reason = match e {
                    CoreError::CaptureNotAuthorized { reason, .. } => reason,
                    other => other.to_string(),
                };
                if let Err(e) = self.port.report_capture_failed(reason).await {
                    warn!(error = ?e, "Failed to report capture failure");
                }
            }
        }
    }

    fn stop(&mut self, folder: Option<String>, filename: Option<String>) {
        if folder.is_some() || filename.is_some() {
            self.destination = DestinationParts { folder, filename };
        }

        match self.phase {
            Phase::Capturing => {
                self.pipeline.stop();
                self.phase = Phase::Stopping;
                info!("Capture stopping");
            }
            Phase::Stopping => debug!("Already stopping, destination updated"),
            Phase::Idle | Phase::Finished => debug!(phase = ?self.phase, "Nothing to stop"),
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if self.phase.is_active() {
            self.pipeline.set_muted(muted);
        }
    }

    async fn finish(&mut self, artifact: Artifact) {
        self.phase = Phase::Finished;
        let mut issued = None;

        if artifact.is_empty() {
            info!("Pipeline produced no media, nothing to save");
        } else {
            let path = self.resolve_destination().await.artifact_path();
            let request = DownloadRequest {
                path: path.clone(),
                artifact,
                prompt_for_location: self.settings.prompt_for_location,
            };

            match self.download.issue(request) {
                Ok(()) => {
                    info!(%path, "Download issued");
                    if let Some(history) = &self.history {
                        if let Err(e) = history.record(&path, Utc::now()).await {
                            warn!(error = ?e, "Failed to record history");
                        }
                    }
                    issued = Some(path);
                }
                Err(e) => error!(%path, error = ?e, "Download could not be issued"),
            }
        }

        if let Err(e) = self.port.report_stopped(issued).await {
            warn!(error = ?e, "Failed to report Stopped");
        }
    }

    async fn resolve_destination(&self) -> Destination {
        if self.destination.folder.is_some() || self.destination.filename.is_some() {
            return Destination::from_parts(&self.destination);
        }

        match self.port.save_path().await {
            Ok(destination) => destination,
            Err(e) => {
                warn!(error = ?e, "Save path query failed, using default");
                Destination::default()
            }
        }
    }
}
