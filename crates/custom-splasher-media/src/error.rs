//! Error types for the media module.

use std::path::PathBuf;

use thiserror::Error;

/// Media-specific errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MediaError {
    /// The media file does not exist.
    #[error("media file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The decoder rejected the media file.
    #[error("failed to read media file {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    /// The stream's frame rate and the speed multiplier give no usable frame interval.
    #[error("bad frame rate ({native_fps} * {speed})")]
    InvalidFrameRate { native_fps: f64, speed: f64 },

    /// A single frame failed to decode mid-stream.
    #[error("failed to decode frame: {0}")]
    FrameDecode(String),

    /// The media kind cannot be handled by this build.
    #[error("unsupported media: {0}")]
    Unsupported(String),
}

impl MediaError {
    /// Whether this error aborts opening the media, as opposed to a per-frame failure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::FrameDecode(_))
    }
}

/// A specialized Result type for media operations.
pub type Result<T> = std::result::Result<T, MediaError>;
