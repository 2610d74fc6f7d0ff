//! Sliding-window sample buffers for live mode
//!
//! A [`RingBuffer`] is always full: it starts as `capacity` zeros and every
//! push evicts exactly as many of the oldest samples as it appends. Storage
//! never shifts; a head index marks the oldest sample.

use crate::error::PipelineError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Fixed-capacity sliding window over one sample stream
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    /// Index of the oldest sample
    head: usize,
}

impl RingBuffer {
    /// Creates a zero-filled window of `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
            head: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Always equal to the capacity
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append `chunk` at the newest end, evicting `chunk.len()` oldest samples.
    ///
    /// Fails with `InvalidChunkSize` (leaving the window untouched) when the
    /// chunk is longer than the capacity.
    pub fn push(&mut self, chunk: &[f32]) -> Result<(), PipelineError> {
        self.check_chunk(chunk.len())?;
        if chunk.is_empty() {
            return Ok(());
        }

        let cap = self.capacity();
        let first = (cap - self.head).min(chunk.len());
        self.data[self.head..self.head + first].copy_from_slice(&chunk[..first]);
        self.data[..chunk.len() - first].copy_from_slice(&chunk[first..]);
        self.head = (self.head + chunk.len()) % cap;
        Ok(())
    }

    pub(crate) fn check_chunk(&self, len: usize) -> Result<(), PipelineError> {
        if len > self.capacity() {
            return Err(PipelineError::InvalidChunkSize {
                chunk: len,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Window contents as two slices, oldest first
    pub fn as_slices(&self) -> (&[f32], &[f32]) {
        (&self.data[self.head..], &self.data[..self.head])
    }

    /// Copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        let (a, b) = self.as_slices();
        let mut out = Vec::with_capacity(self.capacity());
        out.extend_from_slice(a);
        out.extend_from_slice(b);
        out
    }

    /// Reset to all zeros
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.head = 0;
    }
}

/// Consistent copy of both live windows
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub original: Vec<f32>,
    pub processed: Vec<f32>,
    pub sample_rate: u32,
}

/// Original and processed windows that always move together
#[derive(Debug, Clone)]
pub struct LiveBuffers {
    original: RingBuffer,
    processed: RingBuffer,
    /// `None` until the first chunk arrives
    sample_rate: Option<u32>,
    chunks: u64,
}

/// Live buffers shared between a writer (transport) and the renderer.
///
/// The mutex makes each pair push and each snapshot atomic.
pub type SharedLiveBuffers = Arc<Mutex<LiveBuffers>>;

impl LiveBuffers {
    pub fn new(capacity: usize) -> Self {
        Self {
            original: RingBuffer::new(capacity),
            processed: RingBuffer::new(capacity),
            sample_rate: None,
            chunks: 0,
        }
    }

    pub fn shared(capacity: usize) -> SharedLiveBuffers {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn capacity(&self) -> usize {
        self.original.capacity()
    }

    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Chunks accepted since creation
    pub fn chunk_count(&self) -> u64 {
        self.chunks
    }

    /// Push one chunk pair.
    ///
    /// Both chunks are checked before either window changes, so the pair is
    /// applied completely or not at all. A sample-rate change restarts both
    /// windows from silence.
    pub fn push_pair(
        &mut self,
        input: &[f32],
        output: &[f32],
        sample_rate: u32,
    ) -> Result<(), PipelineError> {
        if input.len() != output.len() {
            return Err(PipelineError::MalformedMessage(format!(
                "live chunk lengths differ: input {}, output {}",
                input.len(),
                output.len()
            )));
        }
        if sample_rate == 0 {
            return Err(PipelineError::MalformedMessage(
                "live chunk sample rate must be positive".into(),
            ));
        }
        self.original.check_chunk(input.len())?;

        if let Some(previous) = self.sample_rate {
            if previous != sample_rate {
                tracing::info!(previous, sample_rate, "live sample rate changed, resetting buffers");
                self.original.clear();
                self.processed.clear();
            }
        }

        self.original.push(input)?;
        self.processed.push(output)?;
        self.sample_rate = Some(sample_rate);
        self.chunks += 1;
        Ok(())
    }

    /// Copy both full windows, or `None` before the first chunk
    pub fn snapshot(&self) -> Option<LiveSnapshot> {
        let sample_rate = self.sample_rate?;
        Some(LiveSnapshot {
            original: self.original.snapshot(),
            processed: self.processed.snapshot(),
            sample_rate,
        })
    }

    pub fn original(&self) -> &RingBuffer {
        &self.original
    }

    pub fn processed(&self) -> &RingBuffer {
        &self.processed
    }
}
