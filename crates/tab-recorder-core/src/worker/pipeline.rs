use crate::{CoreResult, session::CaptureToken};

use async_trait::async_trait;
use tokio::sync::mpsc;

/// Final composed recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Encoded media bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime_type: String,
}

impl Artifact {
    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Where a pipeline delivers its artifact once stopping completes.
pub type ArtifactSender = mpsc::Sender<Artifact>;

/// Capture, encoding and gain control, owned by the capture worker.
///
/// Controls other than `start` are fire-and-forget; calls that do not fit
/// the pipeline's current state are ignored by the pipeline.
#[async_trait]
pub trait MediaPipeline: Send + Sync {
    /// Acquire a capture handle for `token` and begin recording. After a
    /// later [`MediaPipeline::stop`], the artifact is sent on `artifacts`.
    ///
    /// # Errors
    ///
    /// [`crate::CoreError::CaptureNotAuthorized`] when the token is refused.
    async fn start(&mut self, token: &CaptureToken, artifacts: ArtifactSender) -> CoreResult<()>;

    /// Suspend recording.
    fn pause(&mut self);

    /// Continue recording.
    fn resume(&mut self);

    /// Set output gain to zero (`true`) or unity (`false`).
    fn set_muted(&mut self, muted: bool);

    /// Request stop. Completion is signalled through the artifact sender.
    fn stop(&mut self);
}
