use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Coordination errors with source location tracking.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Persistent store read or write failed.
    #[error("Store error: {reason} {location}")]
    Store {
        /// Description of the store failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Stored or transmitted data could not be (de)serialized.
    #[error("Serialization error: {source} {location}")]
    Serialization {
        /// Underlying serde_json error.
        #[source]
        source: serde_json::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Filesystem operation failed.
    #[error("IO error: {source} {location}")]
    Io {
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The media pipeline refused to start capturing.
    #[error("Capture not authorized: {reason} {location}")]
    CaptureNotAuthorized {
        /// Reason reported by the media pipeline.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Media pipeline operation failed.
    #[error("Pipeline error: {reason} {location}")]
    Pipeline {
        /// Description of the pipeline failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Download could not be issued.
    #[error("Download failed: {reason} {location}")]
    Download {
        /// Description of the download failure.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A channel between execution contexts closed.
    #[error("Channel closed: {message} {location}")]
    ChannelClosed {
        /// Human-readable error message.
        message: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The coordinator service is no longer running.
    #[error("Coordinator service unavailable {location}")]
    ServiceUnavailable {
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

// Cannot use #[from] because it does not support extra fields.
impl From<serde_json::Error> for CoreError {
    #[track_caller]
    fn from(source: serde_json::Error) -> Self {
        CoreError::Serialization {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    #[track_caller]
    fn from(source: std::io::Error) -> Self {
        CoreError::Io {
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
