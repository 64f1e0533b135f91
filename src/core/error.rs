use std::path::PathBuf;
use thiserror::Error;

use crate::core::clip::{CameraAngle, TimestampKey};

/// Errors raised by the batch index, the stream group and the playback controller.
///
/// None of these are fatal: every caller recovers locally and degrades to a
/// partial or empty view.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("No batch recorded at {0}")]
    NotFound(TimestampKey),

    #[error("Failed to open {angle} clip {}: {reason}", path.display())]
    ResourceBind {
        angle: CameraAngle,
        path: PathBuf,
        reason: String,
    },

    #[error("{angle} stream failed to play: {reason}")]
    Playback { angle: CameraAngle, reason: String },

    #[error("Malformed event metadata in {}: {source}", path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to read event metadata {}: {source}", path.display())]
    MetadataRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No recognizable clips found")]
    EmptyUpload,

    #[error("Invalid playback rate: {0}")]
    InvalidRate(f64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ViewerError>;
