//! Transport error types

use thiserror::Error;

/// Errors at the message boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Payload could not be decoded or failed shape checks
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// The network side hung up
    #[error("transport disconnected")]
    Disconnected,
    /// Outbound queue saturated; the command was dropped
    #[error("outbound queue full, command dropped")]
    QueueFull,
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::MalformedMessage(err.to_string())
    }
}
