use crate::{
    CoreError, CoreResult,
    coordinator::CoordinatorHandle,
    protocol::{Command, CommandReply, Directive},
    session::{Destination, WorkerId},
};

use std::panic::Location;

use async_trait::async_trait;
use error_location::ErrorLocation;
use tokio::sync::mpsc;

/// The capture worker's view of the coordinator.
#[async_trait]
pub trait CoordinatorPort: Send + Sync {
    /// Open a directive channel. The channel ends when either side drops.
    async fn connect(&self, worker_id: WorkerId) -> CoreResult<mpsc::Receiver<Directive>>;

    /// Ask for the last known destination.
    async fn save_path(&self) -> CoreResult<Destination>;

    /// Report that the worker is done, with the issued download path if any.
    async fn report_stopped(&self, path: Option<String>) -> CoreResult<()>;

    /// Report that capture could not start.
    async fn report_capture_failed(&self, reason: String) -> CoreResult<()>;
}

#[async_trait]
impl CoordinatorPort for CoordinatorHandle {
    async fn connect(&self, worker_id: WorkerId) -> CoreResult<mpsc::Receiver<Directive>> {
        self.connect_worker(worker_id).await
    }

    async fn save_path(&self) -> CoreResult<Destination> {
        match self.execute(Command::GetSavePath).await? {
            CommandReply::SavePath(destination) => Ok(destination),
            other => Err(CoreError::ChannelClosed {
                message: format!("Unexpected reply to GET_SAVE_PATH: {other:?}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    async fn report_stopped(&self, path: Option<String>) -> CoreResult<()> {
        self.execute(Command::Stopped { path }).await.map(|_| ())
    }

    async fn report_capture_failed(&self, reason: String) -> CoreResult<()> {
        self.execute(Command::CaptureFailed { reason })
            .await
            .map(|_| ())
    }
}
