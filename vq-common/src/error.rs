//! Common error types for the shared video queue

use thiserror::Error;

/// Common result type for vq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by every vq crate
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Wire frame could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Replicated snapshot violates the queue layout
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
