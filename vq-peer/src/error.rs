//! Error types for vq-peer
//!
//! Queue requests never fail from the caller's point of view (they are
//! fire-and-forget); these errors cover session management, configuration
//! and the HTTP control surface.

use thiserror::Error;
use vq_common::PlayerId;

/// Main error type for vq-peer
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the shared library (config, codec, snapshot layout)
    #[error(transparent)]
    Common(#[from] vq_common::Error),

    /// No peer with this id is present in the session
    #[error("Unknown peer: {0}")]
    UnknownPeer(PlayerId),

    /// A peer with this id already joined
    #[error("Peer already present: {0}")]
    DuplicatePeer(PlayerId),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),
}

/// Convenience Result type using vq-peer Error
pub type Result<T> = std::result::Result<T, Error>;
