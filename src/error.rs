//! One error type for the whole crate.
//! Every variant states *where* things went wrong, so the session can turn it
//! straight into a user-facing notification.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --- loading the overlay photo ---
    #[error("Please select an image file (got {mime})")]
    NotAnImage { mime: String },

    #[error("Image file is too large ({size} bytes, max {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("Failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid image file or corrupted data: {0}")]
    Decode(String),

    #[error("Background task was cancelled before it finished")]
    TaskCancelled,

    #[error("Could not start background task {name}: {reason}")]
    TaskSpawn { name: String, reason: String },

    // --- capture ---
    #[error("Capture failed: video has no dimensions ({width}x{height})")]
    CaptureDimensions { width: u32, height: u32 },

    #[error("Capture failed: {0}")]
    Encode(String),

    #[error("Surface buffer does not match its size: {0}")]
    SurfaceMismatch(String),

    #[error("Failed to save capture to {path}: {source}")]
    SaveCapture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- configuration ---
    #[error("Configuration error: {0}")]
    Config(String),

    // --- desktop shell ---
    #[error("Window init error: {0}")]
    WindowInit(String), // Creating the window failed

    #[error("Window update error: {0}")]
    WindowUpdate(String), // Updating the window buffer failed

    #[error("Camera init error: {0}")]
    CameraInit(String), // Opening/starting the camera failed

    #[error("Camera frame error: {0}")]
    CameraFrame(String), // Grabbing/decoding a frame failed
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for the errors raised before any asynchronous work started.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::NotAnImage { .. } | Error::FileTooLarge { .. })
    }
}
