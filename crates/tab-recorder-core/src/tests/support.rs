//! Fakes and fixtures shared by the unit tests.

use crate::{
    Artifact, ArtifactSender, CaptureToken, Clock, Coordinator, CoordinatorPort, CoreError,
    CoreResult, Destination, Directive, DownloadAdapter, DownloadRequest, FallbackTransport,
    LinkRegistry, ManualClock, MediaPipeline, MemoryStore, PersistentStore, SessionSettings,
    WorkerId,
};

use std::{
    collections::VecDeque,
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use error_location::ErrorLocation;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub(crate) const START_MS: u64 = 1_700_000_000_000;

/// Shared, ordered log of side effects across fakes.
pub(crate) type Timeline = Arc<Mutex<Vec<String>>>;

pub(crate) fn timeline() -> Timeline {
    Arc::new(Mutex::new(Vec::new()))
}

/// Fallback that records what it was asked to send.
#[derive(Default)]
pub(crate) struct RecordingFallback {
    pub sent: Mutex<Vec<(WorkerId, Directive)>>,
    pub accept: bool,
}

impl RecordingFallback {
    pub fn accepting() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            accept: true,
        }
    }

    pub fn refusing() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(WorkerId, Directive)> {
        self.sent.lock().unwrap().clone()
    }
}

impl FallbackTransport for RecordingFallback {
    fn send_direct(&self, worker_id: WorkerId, directive: &Directive) -> Result<(), String> {
        self.sent.lock().unwrap().push((worker_id, directive.clone()));
        if self.accept {
            Ok(())
        } else {
            Err("worker unreachable".to_string())
        }
    }
}

/// Store whose every operation fails.
pub(crate) struct FailingStore;

#[async_trait]
impl PersistentStore for FailingStore {
    async fn get(&self, _keys: &[&str]) -> CoreResult<Map<String, Value>> {
        Err(store_error())
    }

    async fn set(&self, _entries: Map<String, Value>) -> CoreResult<()> {
        Err(store_error())
    }

    async fn remove(&self, _keys: &[&str]) -> CoreResult<()> {
        Err(store_error())
    }
}

fn store_error() -> CoreError {
    CoreError::Store {
        reason: "disk on fire".to_string(),
        location: ErrorLocation::from(Location::caller()),
    }
}

/// Coordinator wired to a manual clock, a shared memory store and a
/// recording fallback.
pub(crate) struct Fixture {
    pub coordinator: Coordinator,
    pub clock: ManualClock,
    pub store: MemoryStore,
    pub fallback: Arc<RecordingFallback>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_settings(SessionSettings::default())
    }

    pub fn with_settings(settings: SessionSettings) -> Self {
        let clock = ManualClock::new(START_MS);
        let store = MemoryStore::new();
        Self::build(clock, store, settings)
    }

    pub fn build(clock: ManualClock, store: MemoryStore, settings: SessionSettings) -> Self {
        let fallback = Arc::new(RecordingFallback::refusing());
        let coordinator = Coordinator::new(
            LinkRegistry::new(fallback.clone()),
            Arc::new(store.clone()),
            Arc::new(clock.clone()) as Arc<dyn Clock>,
            settings,
        );
        Self {
            coordinator,
            clock,
            store,
            fallback,
        }
    }

    /// A second coordinator over the same store and clock, as after a restart.
    pub fn restarted(&self, settings: SessionSettings) -> Self {
        Self::build(self.clock.clone(), self.store.clone(), settings)
    }

    /// Register a channel for `worker_id` and return its receiving side.
    pub fn connect(&mut self, worker_id: u64) -> mpsc::Receiver<Directive> {
        let (tx, rx) = mpsc::channel(16);
        self.coordinator.register_worker(WorkerId(worker_id), tx);
        rx
    }

    pub fn advance_secs(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
    }
}

/// Drain everything currently queued on a directive receiver.
pub(crate) fn drain(rx: &mut mpsc::Receiver<Directive>) -> Vec<Directive> {
    let mut directives = Vec::new();
    while let Ok(directive) = rx.try_recv() {
        directives.push(directive);
    }
    directives
}

/// Observable state of a [`FakePipeline`].
#[derive(Debug, Default)]
pub(crate) struct PipelineLog {
    pub tokens: Vec<String>,
    pub calls: Vec<String>,
}

/// Media pipeline that completes instantly.
pub(crate) struct FakePipeline {
    pub log: Arc<Mutex<PipelineLog>>,
    refuse: bool,
    artifact_bytes: Vec<u8>,
    artifacts: Option<ArtifactSender>,
}

impl FakePipeline {
    pub fn new(artifact_bytes: &[u8]) -> Self {
        Self {
            log: Arc::new(Mutex::new(PipelineLog::default())),
            refuse: false,
            artifact_bytes: artifact_bytes.to_vec(),
            artifacts: None,
        }
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new(b"")
        }
    }

    fn call(&self, name: &str) {
        self.log.lock().unwrap().calls.push(name.to_string());
    }
}

#[async_trait]
impl MediaPipeline for FakePipeline {
    async fn start(&mut self, token: &CaptureToken, artifacts: ArtifactSender) -> CoreResult<()> {
        if self.refuse {
            return Err(CoreError::CaptureNotAuthorized {
                reason: "capture not authorized".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.log
            .lock()
            .unwrap()
            .tokens
            .push(token.as_str().to_string());
        self.artifacts = Some(artifacts);
        Ok(())
    }

    fn pause(&mut self) {
        self.call("pause");
    }

    fn resume(&mut self) {
        self.call("resume");
    }

    fn set_muted(&mut self, muted: bool) {
        self.call(if muted { "mute" } else { "unmute" });
    }

    fn stop(&mut self) {
        self.call("stop");
        if let Some(artifacts) = self.artifacts.take() {
            let _ = artifacts.try_send(Artifact {
                bytes: self.artifact_bytes.clone(),
                mime_type: "video/webm".to_string(),
            });
        }
    }
}

/// Download adapter that records requests.
pub(crate) struct RecordingDownloader {
    pub requests: Mutex<Vec<DownloadRequest>>,
    timeline: Timeline,
    fail: bool,
}

impl RecordingDownloader {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            timeline,
            fail: false,
        }
    }

    pub fn failing(timeline: Timeline) -> Self {
        Self {
            fail: true,
            ..Self::new(timeline)
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.path.clone())
            .collect()
    }
}

impl DownloadAdapter for RecordingDownloader {
    fn issue(&self, request: DownloadRequest) -> CoreResult<()> {
        self.timeline
            .lock()
            .unwrap()
            .push(format!("download {}", request.path));
        if self.fail {
            return Err(CoreError::Download {
                reason: "quota exceeded".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

/// Coordinator port that hands out pre-made channels and records reports.
pub(crate) struct FakePort {
    receivers: Mutex<VecDeque<mpsc::Receiver<Directive>>>,
    save_path: Option<Destination>,
    timeline: Timeline,
    pub connects: AtomicUsize,
    pub save_path_queries: AtomicUsize,
    pub stopped_paths: Mutex<Vec<Option<String>>>,
}

impl FakePort {
    pub fn new(timeline: Timeline, save_path: Option<Destination>) -> Self {
        Self {
            receivers: Mutex::new(VecDeque::new()),
            save_path,
            timeline,
            connects: AtomicUsize::new(0),
            save_path_queries: AtomicUsize::new(0),
            stopped_paths: Mutex::new(Vec::new()),
        }
    }

    /// Queue a channel for the next `connect` and return its sending side.
    pub fn offer_channel(&self) -> mpsc::Sender<Directive> {
        let (tx, rx) = mpsc::channel(16);
        self.receivers.lock().unwrap().push_back(rx);
        tx
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CoordinatorPort for FakePort {
    async fn connect(&self, _worker_id: WorkerId) -> CoreResult<mpsc::Receiver<Directive>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.receivers.lock().unwrap().pop_front();
        next.ok_or_else(|| CoreError::ServiceUnavailable {
            location: ErrorLocation::from(Location::caller()),
        })
    }

    async fn save_path(&self) -> CoreResult<Destination> {
        self.save_path_queries.fetch_add(1, Ordering::SeqCst);
        self.save_path
            .clone()
            .ok_or_else(|| CoreError::ServiceUnavailable {
                location: ErrorLocation::from(Location::caller()),
            })
    }

    async fn report_stopped(&self, path: Option<String>) -> CoreResult<()> {
        self.timeline.lock().unwrap().push("stopped".to_string());
        self.stopped_paths.lock().unwrap().push(path);
        Ok(())
    }

    async fn report_capture_failed(&self, reason: String) -> CoreResult<()> {
        self.timeline
            .lock()
            .unwrap()
            .push(format!("capture_failed {reason}"));
        Ok(())
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
