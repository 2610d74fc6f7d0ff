//! Error types for the analysis kernels

use thiserror::Error;

/// Errors raised by the spectrum and chroma kernels
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Frame length does not match the transform size
    #[error("invalid frame: expected {expected} samples, got {got}")]
    InvalidFrame { expected: usize, got: usize },
    /// Frame contains NaN or infinity
    #[error("invalid frame: non-finite sample at index {index}")]
    NonFiniteSample { index: usize },
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    /// Analyzer constructed with unusable parameters
    #[error("invalid analysis config: {0}")]
    InvalidConfig(String),
}
