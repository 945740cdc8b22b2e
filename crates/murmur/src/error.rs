//! Error types for the node.

use murmur_sync::SyncError;
use thiserror::Error;

/// Errors that can occur while starting or running a node.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Protocol or transport error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The transport handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
