//! Time-domain decimation for waveform traces

/// Default stride: 131072 samples -> ~3277 plotted points
pub const DEFAULT_DECIMATION_STRIDE: usize = 40;

/// Decimated waveform trace ready for plotting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveformTrace {
    /// `input[stride * j]` for every `j` that stays in range
    pub points: Vec<f32>,
    /// Source samples per point
    pub stride: usize,
    /// Duration covered by the source window in seconds
    pub duration_secs: f64,
}

impl WaveformTrace {
    /// Decimate a window sampled at `sample_rate`
    pub fn from_window(samples: &[f32], stride: usize, sample_rate: u32) -> Self {
        let duration_secs = if sample_rate > 0 {
            samples.len() as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            points: decimate(samples, stride),
            stride: stride.max(1),
            duration_secs,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Time offset of point `j` from the start of the window, in seconds
    pub fn time_of(&self, point: usize, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        (point * self.stride) as f64 / sample_rate as f64
    }
}

/// Keep every `stride`-th sample, starting with the first.
///
/// A zero stride is treated as 1.
pub fn decimate(samples: &[f32], stride: usize) -> Vec<f32> {
    samples.iter().step_by(stride.max(1)).copied().collect()
}

/// Number of points `decimate` produces for `len` samples
pub fn decimated_len(len: usize, stride: usize) -> usize {
    let stride = stride.max(1);
    len.div_ceil(stride)
}
