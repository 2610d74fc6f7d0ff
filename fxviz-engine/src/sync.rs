//! Time-aligned analysis windows from a full track

use crate::config::DEFAULT_LOOKAHEAD_SECS;
use crate::track::FullTrack;

/// Original and processed windows ending at the same sample
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedWindow {
    pub original: Vec<f32>,
    pub processed: Vec<f32>,
    /// Exclusive end index into the track
    pub end_index: usize,
    /// Zero samples at the head of the window
    pub padding: usize,
}

/// Cuts latency-compensated windows out of a [`FullTrack`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSynchronizer {
    lookahead_secs: f64,
}

impl Default for PlaybackSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKAHEAD_SECS)
    }
}

impl PlaybackSynchronizer {
    pub fn new(lookahead_secs: f64) -> Self {
        Self { lookahead_secs }
    }

    pub fn lookahead_secs(&self) -> f64 {
        self.lookahead_secs
    }

    /// `floor((time + lookahead) * sample_rate)`, clamped to `[0, len]`.
    ///
    /// Non-finite times map to the start of the track.
    pub fn sample_index(&self, time: f64, sample_rate: u32, len: usize) -> usize {
        let effective = time + self.lookahead_secs;
        if !effective.is_finite() {
            return 0;
        }
        let idx = (effective * sample_rate as f64).floor();
        if idx <= 0.0 {
            0
        } else if idx >= len as f64 {
            len
        } else {
            idx as usize
        }
    }

    /// Window of exactly `window_size` samples per stream ending at the
    /// playback position.
    ///
    /// Near the start of the track the available samples are right-aligned
    /// and the head is zero, so the display scrolls in from silence.
    pub fn window_at(&self, time: f64, track: &FullTrack, window_size: usize) -> AlignedWindow {
        let idx = self.sample_index(time, track.sample_rate(), track.len());

        if idx >= window_size {
            let start = idx - window_size;
            return AlignedWindow {
                original: track.original()[start..idx].to_vec(),
                processed: track.processed()[start..idx].to_vec(),
                end_index: idx,
                padding: 0,
            };
        }

        let padding = window_size - idx;
        let mut original = vec![0.0; window_size];
        let mut processed = vec![0.0; window_size];
        original[padding..].copy_from_slice(&track.original()[..idx]);
        processed[padding..].copy_from_slice(&track.processed()[..idx]);

        AlignedWindow {
            original,
            processed,
            end_index: idx,
            padding,
        }
    }
}
