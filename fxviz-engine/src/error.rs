//! Pipeline error taxonomy
//!
//! Every variant is recoverable: the session logs it, skips the affected
//! chunk, message or render cycle, and keeps going.

use fxviz_analysis::AnalysisError;
use fxviz_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Live chunk larger than the ring buffer; the chunk is dropped
    #[error("chunk of {chunk} samples exceeds ring capacity {capacity}")]
    InvalidChunkSize { chunk: usize, capacity: usize },
    /// Transform input rejected; the render cycle is skipped
    #[error("invalid frame: {0}")]
    InvalidFrame(#[from] AnalysisError),
    /// Nothing received yet; rendering is a no-op until data arrives
    #[error("no data received yet")]
    TransportUnavailable,
    /// Undecodable or inconsistent payload; the message is dropped
    #[error("malformed message: {0}")]
    MalformedMessage(String),
    /// The transport link hung up
    #[error("transport disconnected")]
    Disconnected,
    /// Outbound queue saturated; the command was dropped
    #[error("outbound queue full, command dropped")]
    CommandDropped,
    #[error("invalid config: {0}")]
    Config(String),
}

impl From<TransportError> for PipelineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::MalformedMessage(msg) => PipelineError::MalformedMessage(msg),
            TransportError::Disconnected => PipelineError::Disconnected,
            TransportError::QueueFull => PipelineError::CommandDropped,
        }
    }
}
