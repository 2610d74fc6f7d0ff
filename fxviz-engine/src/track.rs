//! Fully processed tracks for playback mode

use crate::error::PipelineError;
use fxviz_transport::{AudioBlob, FileProcessed};
use parking_lot::RwLock;
use std::sync::Arc;

/// Sample-aligned original/processed pair of one processed file
#[derive(Debug, Clone, PartialEq)]
pub struct FullTrack {
    original: Vec<f32>,
    processed: Vec<f32>,
    sample_rate: u32,
    original_audio: Option<AudioBlob>,
    processed_audio: Option<AudioBlob>,
}

impl FullTrack {
    /// Build a track from two equal-length sample arrays
    pub fn new(
        original: Vec<f32>,
        processed: Vec<f32>,
        sample_rate: u32,
    ) -> Result<Self, PipelineError> {
        if original.len() != processed.len() {
            return Err(PipelineError::MalformedMessage(format!(
                "track lengths differ: original {}, processed {}",
                original.len(),
                processed.len()
            )));
        }
        if sample_rate == 0 {
            return Err(PipelineError::MalformedMessage(
                "track sample rate must be positive".into(),
            ));
        }
        Ok(Self {
            original,
            processed,
            sample_rate,
            original_audio: None,
            processed_audio: None,
        })
    }

    /// Attach the playable payloads handed to the players
    pub fn with_audio(mut self, original: Option<AudioBlob>, processed: Option<AudioBlob>) -> Self {
        self.original_audio = original;
        self.processed_audio = processed;
        self
    }

    pub fn from_message(msg: FileProcessed) -> Result<Self, PipelineError> {
        let FileProcessed {
            original_samples,
            processed_samples,
            sample_rate,
            original_audio,
            processed_audio,
        } = msg;
        Ok(Self::new(original_samples, processed_samples, sample_rate)?
            .with_audio(original_audio, processed_audio))
    }

    pub fn len(&self) -> usize {
        self.original.len()
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn original(&self) -> &[f32] {
        &self.original
    }

    pub fn processed(&self) -> &[f32] {
        &self.processed
    }

    pub fn original_audio(&self) -> Option<&AudioBlob> {
        self.original_audio.as_ref()
    }

    pub fn processed_audio(&self) -> Option<&AudioBlob> {
        self.processed_audio.as_ref()
    }
}

/// Holder of the current track, replaced wholesale.
///
/// Readers clone the `Arc` and never observe a half-replaced pair.
#[derive(Debug, Default)]
pub struct TrackStore {
    current: RwLock<Option<Arc<FullTrack>>>,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new track, returning the previous one
    pub fn replace(&self, track: Arc<FullTrack>) -> Option<Arc<FullTrack>> {
        self.current.write().replace(track)
    }

    pub fn current(&self) -> Option<Arc<FullTrack>> {
        self.current.read().clone()
    }

    pub fn clear(&self) -> Option<Arc<FullTrack>> {
        self.current.write().take()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }
}
