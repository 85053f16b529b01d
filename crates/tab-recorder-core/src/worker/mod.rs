//! Capture worker side of the protocol.

mod controller;
mod download;
mod history;
mod pipeline;
mod port;

pub use {
    controller::{CaptureWorkerController, DEFAULT_RECONNECT_BACKOFF, WorkerSettings},
    download::{DownloadAdapter, DownloadRequest, FsDownloader},
    history::{HISTORY_KEY, HistoryEntry, MAX_HISTORY_ENTRIES, RecordingHistory},
    pipeline::{Artifact, ArtifactSender, MediaPipeline},
    port::CoordinatorPort,
};
