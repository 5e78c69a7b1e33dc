//! Error types for FlexCall core

use thiserror::Error;

/// Result type alias for FlexCall core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the FlexCall core
#[derive(Debug, Error)]
pub enum Error {
    /// Signaling store write or delete failed
    #[error("Transport write failed: {0}")]
    TransportWrite(String),

    /// Conversation has no ongoing-call log
    #[error("Unknown conversation: {0}")]
    UnknownConversation(String),

    /// Payload could not be parsed into a known value
    #[error("Invalid signaling payload: {0}")]
    InvalidPayload(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
