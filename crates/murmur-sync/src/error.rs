//! Error types for the sync module.

use thiserror::Error;

use murmur_core::NodeId;

use crate::messages::ErrorCode;

/// Errors that can occur while handling or exchanging gossip messages.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Inbound payload did not match the expected shape.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Topology did not mention this node.
    #[error("topology has no entry for node {0}")]
    MissingTopologyEntry(NodeId),

    /// No handler for this message type.
    #[error("unsupported message type: {0}")]
    NotSupported(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Outbound message could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid gossip configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A background task panicked or was cancelled.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The transport has no more inbound messages.
    #[error("transport closed")]
    Closed,
}

impl SyncError {
    /// Protocol error code reported to the sender of a failed request.
    pub fn code(&self) -> ErrorCode {
        match self {
            SyncError::MalformedRequest(_) | SyncError::MissingTopologyEntry(_) => {
                ErrorCode::MalformedRequest
            }
            SyncError::NotSupported(_) => ErrorCode::NotSupported,
            SyncError::TransportError(_) | SyncError::Closed => ErrorCode::TemporarilyUnavailable,
            SyncError::Serialization(_)
            | SyncError::InvalidConfig(_)
            | SyncError::TaskFailed(_) => ErrorCode::Crash,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
