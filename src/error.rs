//! Error types for the parallax diorama library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filter initialization error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Landmark inference failed for a frame
    #[error("Tracking error: {0}")]
    TrackingError(String),

    /// Capture device could not be opened (permission denied or unsupported)
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// Backdrop texture could not be decoded or bound
    #[error("Texture error: {0}")]
    TextureError(String),

    /// Render collaborator failed
    #[error("Render error: {0}")]
    RenderError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
