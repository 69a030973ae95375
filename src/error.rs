//! Error types for the face overlay library.
//!
//! Boundary operations return [`Result`]; the UI-event dispatcher in
//! [`crate::app`] is the only place where errors are turned into
//! [`Notification`]s for the user.

use crate::keypoints::Feature;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "vision")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or buffer operation failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Camera or video file could not be opened or read
    #[error("Video source error: {0}")]
    Source(String),

    /// The video source has no more frames
    #[error("Video source exhausted: {0}")]
    SourceExhausted(String),

    /// Video file path is missing or has an unsupported extension
    #[error("Invalid video path: {0}")]
    InvalidPath(String),

    /// A single overlay sprite could not be loaded
    #[error("Overlay asset for {feature} at {path:?} unavailable: {reason}")]
    Asset {
        /// Feature the sprite belongs to
        feature: Feature,
        /// Path that was tried
        path: PathBuf,
        /// Human-readable cause
        reason: String,
    },

    /// No asset directory exists for the requested identity
    #[error("Unknown overlay identity: {0}")]
    UnknownIdentity(String),

    /// The identity directory exists but none of its sprites could be loaded
    #[error("No overlay sprites could be loaded for {0}")]
    NoSprites(String),

    /// Capture was requested before an overlay identity was loaded
    #[error("No overlay identity selected")]
    NoIdentity,

    /// The asset root contains no identity directories at all
    #[error("No overlay asset directories found under {0}")]
    NoAssets(String),

    /// A transform would need an unreasonably large buffer
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Face detector model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Smoothing filter construction error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Status or error message produced for the user-facing layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The capture session ended because the source ran out of frames
    SourceExhausted(String),
    /// The capture source could not be opened or failed mid-session
    SourceFailed(String),
    /// An overlay identity or sprite failed to load
    LoadFailed(String),
    /// A video path was rejected before opening
    InvalidPath(String),
    /// The capture session was stopped on request
    Stopped,
    /// Non-fatal problem the user should know about
    Warning(String),
    /// Plain status message
    Info(String),
}

impl Notification {
    /// Whether the notification reports a failure
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::SourceFailed(_) | Self::LoadFailed(_) | Self::InvalidPath(_)
        )
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceExhausted(source) => write!(f, "Video ended: {source}"),
            Self::SourceFailed(msg) => write!(f, "Cannot use video source: {msg}"),
            Self::LoadFailed(msg) => write!(f, "Overlay load failed: {msg}"),
            Self::InvalidPath(msg) => write!(f, "Invalid video file: {msg}"),
            Self::Stopped => write!(f, "Capture stopped"),
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Info(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error {
    /// Convert into the notification shown to the user
    #[must_use]
    pub fn notification(&self) -> Notification {
        match self {
            Self::SourceExhausted(source) => Notification::SourceExhausted(source.clone()),
            Self::InvalidPath(path) => Notification::InvalidPath(path.clone()),
            Self::Source(_) | Self::Io(_) => Notification::SourceFailed(self.to_string()),
            #[cfg(feature = "vision")]
            Self::OpenCV(_) => Notification::SourceFailed(self.to_string()),
            Self::Asset { .. }
            | Self::UnknownIdentity(_)
            | Self::NoSprites(_)
            | Self::NoAssets(_)
            | Self::Image(_) => {
                Notification::LoadFailed(self.to_string())
            }
            Self::NoIdentity => Notification::Warning("Select an overlay target first".to_string()),
            _ => Notification::Warning(self.to_string()),
        }
    }
}
