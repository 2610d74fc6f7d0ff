//! Inbound notifications from the effect engine

use crate::error::TransportError;
use serde::{Deserialize, Serialize};

/// Opaque playable audio payload (typically a `data:audio/wav;base64,...` URI).
///
/// Handed to the playback widgets untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioBlob(pub String);

impl AudioBlob {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One live chunk pair: dry input and processed output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub input: Vec<f32>,
    pub output: Vec<f32>,
    pub sample_rate: u32,
}

/// A fully processed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileProcessed {
    pub original_samples: Vec<f32>,
    pub processed_samples: Vec<f32>,
    pub sample_rate: u32,
    #[serde(default, alias = "original_b64", skip_serializing_if = "Option::is_none")]
    pub original_audio: Option<AudioBlob>,
    #[serde(default, alias = "processed_b64", skip_serializing_if = "Option::is_none")]
    pub processed_audio: Option<AudioBlob>,
}

/// Messages received from the effect engine, tagged by `"type"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    PlotData(PlotData),
    FileProcessed(FileProcessed),
}

impl InboundMessage {
    /// Decode a JSON text frame and check its shape
    pub fn decode(text: &str) -> Result<Self, TransportError> {
        let message: InboundMessage = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Encode to a JSON text frame
    pub fn encode(&self) -> Result<String, TransportError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Original and processed streams must have equal length and a real
    /// sample rate.
    pub fn validate(&self) -> Result<(), TransportError> {
        let (kind, original, processed, sample_rate) = match self {
            InboundMessage::PlotData(p) => ("plot_data", p.input.len(), p.output.len(), p.sample_rate),
            InboundMessage::FileProcessed(f) => (
                "file_processed",
                f.original_samples.len(),
                f.processed_samples.len(),
                f.sample_rate,
            ),
        };
        if original != processed {
            return Err(TransportError::MalformedMessage(format!(
                "{}: original has {} samples, processed has {}",
                kind, original, processed
            )));
        }
        if sample_rate == 0 {
            return Err(TransportError::MalformedMessage(format!(
                "{}: sample rate must be positive",
                kind
            )));
        }
        Ok(())
    }

    /// Short tag for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::PlotData(_) => "plot_data",
            InboundMessage::FileProcessed(_) => "file_processed",
        }
    }
}
