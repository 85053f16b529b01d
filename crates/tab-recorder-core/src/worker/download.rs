use crate::{CoreError, CoreResult, worker::Artifact};

use std::{panic::Location, path::PathBuf};

use error_location::ErrorLocation;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{error, info};

/// A request to save an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Relative `folder/filename` path.
    pub path: String,
    /// Media to save.
    pub artifact: Artifact,
    /// Let the user confirm or change the location.
    pub prompt_for_location: bool,
}

/// Issues artifact downloads.
///
/// `issue` returns once the download is handed off, not when it completes.
pub trait DownloadAdapter: Send + Sync {
    /// Hand off `request`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the download could not be started.
    fn issue(&self, request: DownloadRequest) -> CoreResult<()>;
}

/// Writes artifacts beneath a root directory on a background task.
///
/// There is nobody to prompt, so `prompt_for_location` is ignored.
#[derive(Debug, Clone)]
pub struct FsDownloader {
    root: PathBuf,
}

impl FsDownloader {
    /// Save artifacts under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[track_caller]
    fn target(&self, relative: &str) -> CoreResult<PathBuf> {
        let relative = std::path::Path::new(relative);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                std::path::Component::ParentDir
                    | std::path::Component::RootDir
                    | std::path::Component::Prefix(_)
            )
        });
        if escapes {
            return Err(CoreError::Download {
                reason: format!("Path {relative:?} escapes the download directory"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl DownloadAdapter for FsDownloader {
    fn issue(&self, request: DownloadRequest) -> CoreResult<()> {
        let target = self.target(&request.path)?;
        let handle = tokio::runtime::Handle::try_current().map_err(|e| CoreError::Download {
            reason: format!("No async runtime to write on: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        handle.spawn(async move {
            match write_artifact(&target, &request.artifact.bytes).await {
                Ok(()) => info!(path = ?target, bytes = request.artifact.bytes.len(), "Artifact saved"),
                Err(e) => error!(path = ?target, error = ?e, "Failed to save artifact"),
            }
        });

        Ok(())
    }
}

async fn write_artifact(target: &std::path::Path, bytes: &[u8]) -> CoreResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::File::create(target).await?;
    file.write_all(bytes).await?;
    file.sync_all().await?;
    Ok(())
}
