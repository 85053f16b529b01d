//! Tab Recorder Core Library
//!
//! Coordination protocol for a recording session split between a long-lived
//! coordinator and a short-lived capture worker.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tab_recorder_core::{
//!     Command, CoordinatorService, CoreResult, DiscardFallback, MemoryStore, SessionSettings,
//!     SystemClock, WorkerId,
//! };
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> CoreResult<()> {
//!     let (service, handle) = CoordinatorService::new(
//!         Arc::new(MemoryStore::new()),
//!         Arc::new(SystemClock),
//!         Arc::new(DiscardFallback),
//!         SessionSettings::default(),
//!     );
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!     tokio::spawn(service.run(shutdown_rx));
//!
//!     handle
//!         .execute(Command::Start {
//!             worker_id: WorkerId(5),
//!             folder: Some("Clips".to_string()),
//!             filename: Some("demo".to_string()),
//!         })
//!         .await?;
//!
//!     let status = handle.status().await?;
//!     println!("{} {}", status.timer, status.filename.unwrap_or_default());
//!     Ok(())
//! }
//! ```

mod clock;
mod coordinator;
mod error;
mod link;
mod protocol;
mod session;
mod store;
mod worker;

pub use {
    clock::{Clock, ManualClock, SystemClock},
    coordinator::{
        Coordinator, CoordinatorHandle, CoordinatorService, DEFAULT_STOP_TIMEOUT,
        SessionSettings,
    },
    error::{CoreError, Result as CoreResult},
    link::{
        Delivered, DeliveryPath, DiscardFallback, Dropped, FallbackTransport, LinkId,
        LinkRegistry, PendingHandoff, SendOutcome, Teardown, WorkerSender,
    },
    protocol::{Ack, Command, CommandReply, Directive, SessionStatus},
    session::{
        CaptureToken, DEFAULT_FILENAME, DEFAULT_FOLDER, Destination, DestinationParts,
        ElapsedTimer, MEDIA_EXTENSION, Session, SessionState, WorkerId, format_timer,
    },
    store::{JsonFileStore, MemoryStore, PersistentStore, SessionMirror},
    worker::{
        Artifact, ArtifactSender, CaptureWorkerController, CoordinatorPort,
        DEFAULT_RECONNECT_BACKOFF, DownloadAdapter, DownloadRequest, FsDownloader, HISTORY_KEY,
        HistoryEntry, MAX_HISTORY_ENTRIES, MediaPipeline, RecordingHistory, WorkerSettings,
    },
};

#[cfg(test)]
mod tests;
