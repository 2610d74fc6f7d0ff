//! FFT magnitude spectrum for live and playback frames

use crate::error::AnalysisError;
use crate::window::blackman_harris;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Default transform size (~2.9 Hz/bin at 48 kHz)
pub const DEFAULT_FFT_SIZE: usize = 16384;

/// Peak search ignores bins at or below this frequency (DC and rumble)
pub const DEFAULT_PEAK_MIN_FREQ: f32 = 60.0;

/// Floor added to normalized magnitudes before the logarithm
const DB_EPSILON: f32 = 1e-9;

/// One frequency bin of a spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumBin {
    pub frequency: f32,
    pub magnitude_db: f32,
}

/// dB spectrum over bins `0..=N/2`, increasing in frequency
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub bins: Vec<SpectrumBin>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

/// Result of analyzing one frame
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumAnalysis {
    pub spectrum: Spectrum,
    /// Linear magnitudes `|X[k]| / N`, indexed like `spectrum.bins`
    pub linear: Vec<f32>,
    /// Frequency of the loudest bin above the peak floor
    pub peak_frequency: Option<f32>,
}

/// Blackman-Harris windowed FFT analyzer
///
/// Holds the FFT plan, the window and a scratch buffer. Every call rewrites
/// the scratch buffer completely, so the same frame always yields the same
/// output.
pub struct SpectrumAnalyzer {
    fft_size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    peak_min_freq: f32,
    /// Pre-allocated FFT buffer to avoid allocation in analyze()
    fft_buffer: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for frames of exactly `fft_size` samples.
    ///
    /// `fft_size` must be a power of two.
    pub fn new(fft_size: usize) -> Result<Self, AnalysisError> {
        if fft_size < 2 || !fft_size.is_power_of_two() {
            return Err(AnalysisError::InvalidConfig(format!(
                "fft size must be a power of two >= 2, got {}",
                fft_size
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            fft_size,
            fft,
            window: blackman_harris(fft_size),
            peak_min_freq: DEFAULT_PEAK_MIN_FREQ,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
        })
    }

    /// Override the peak search floor
    pub fn with_peak_min_freq(mut self, hz: f32) -> Self {
        self.peak_min_freq = hz;
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of meaningful bins (`N/2 + 1`)
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency of bin `k`: `k * sample_rate / N`
    #[inline]
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.fft_size as f32
    }

    /// Analyze one frame.
    ///
    /// Fails with `InvalidFrame` when the frame length differs from the
    /// transform size, and with `NonFiniteSample` on NaN/inf input.
    pub fn analyze(
        &mut self,
        frame: &[f32],
        sample_rate: u32,
    ) -> Result<SpectrumAnalysis, AnalysisError> {
        if frame.len() != self.fft_size {
            return Err(AnalysisError::InvalidFrame {
                expected: self.fft_size,
                got: frame.len(),
            });
        }
        if let Some(index) = frame.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::NonFiniteSample { index });
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidSampleRate(sample_rate));
        }

        for ((slot, &s), &w) in self.fft_buffer.iter_mut().zip(frame).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let n = self.fft_size as f32;
        let bin_count = self.bin_count();
        let mut bins = Vec::with_capacity(bin_count);
        let mut linear = Vec::with_capacity(bin_count);
        let mut peak: Option<(f32, f32)> = None;

        for (k, c) in self.fft_buffer[..bin_count].iter().enumerate() {
            let frequency = self.bin_frequency(k, sample_rate);
            let magnitude = c.norm() / n;
            let magnitude_db = 20.0 * (magnitude + DB_EPSILON).log10();

            if frequency > self.peak_min_freq {
                match peak {
                    Some((_, best_db)) if magnitude_db <= best_db => {}
                    _ => peak = Some((frequency, magnitude_db)),
                }
            }

            bins.push(SpectrumBin {
                frequency,
                magnitude_db,
            });
            linear.push(magnitude);
        }

        Ok(SpectrumAnalysis {
            spectrum: Spectrum { bins },
            linear,
            peak_frequency: peak.map(|(f, _)| f),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(SpectrumAnalyzer::new(1000).is_err());
        assert!(SpectrumAnalyzer::new(0).is_err());
        assert!(SpectrumAnalyzer::new(1024).is_ok());
    }

    #[test]
    fn test_wrong_length_is_invalid_frame() {
        let mut analyzer = SpectrumAnalyzer::new(1024).unwrap();
        let err = analyzer.analyze(&[0.0; 512], 48000).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InvalidFrame {
                expected: 1024,
                got: 512
            }
        );
    }

    #[test]
    fn test_non_finite_is_rejected() {
        let mut analyzer = SpectrumAnalyzer::new(256).unwrap();
        let mut frame = vec![0.0f32; 256];
        frame[17] = f32::NAN;
        assert_eq!(
            analyzer.analyze(&frame, 48000).unwrap_err(),
            AnalysisError::NonFiniteSample { index: 17 }
        );
    }

    #[test]
    fn test_bin_layout() {
        let mut analyzer = SpectrumAnalyzer::new(1024).unwrap();
        let result = analyzer.analyze(&vec![0.0; 1024], 48000).unwrap();
        assert_eq!(result.spectrum.len(), 513);
        assert_eq!(result.linear.len(), 513);
        for (k, bin) in result.spectrum.bins.iter().enumerate() {
            assert_eq!(bin.frequency, k as f32 * 48000.0 / 1024.0);
        }
        assert_eq!(result.spectrum.bins[512].frequency, 24000.0);
    }

    #[test]
    fn test_silence_hits_epsilon_floor() {
        let mut analyzer = SpectrumAnalyzer::new(512).unwrap();
        let result = analyzer.analyze(&vec![0.0; 512], 44100).unwrap();
        for bin in &result.spectrum.bins {
            assert!((bin.magnitude_db + 180.0).abs() < 0.01);
        }
    }

    #[test]
    fn test_peak_frequency_tracks_sine() {
        let mut analyzer = SpectrumAnalyzer::new(DEFAULT_FFT_SIZE).unwrap();
        let frame = sine(1000.0, 48000, DEFAULT_FFT_SIZE);
        let result = analyzer.analyze(&frame, 48000).unwrap();
        let peak = result.peak_frequency.unwrap();
        let resolution = 48000.0 / DEFAULT_FFT_SIZE as f32;
        assert!(
            (peak - 1000.0).abs() <= resolution,
            "peak {} should be within one bin of 1000 Hz",
            peak
        );
    }

    #[test]
    fn test_peak_ignores_dc() {
        let mut analyzer = SpectrumAnalyzer::new(4096).unwrap();
        // Strong DC offset plus a weaker 440 Hz tone
        let frame: Vec<f32> = sine(440.0, 48000, 4096)
            .into_iter()
            .map(|s| 0.9 + 0.05 * s)
            .collect();
        let result = analyzer.analyze(&frame, 48000).unwrap();
        let peak = result.peak_frequency.unwrap();
        assert!(peak > 60.0, "peak {} must skip the DC region", peak);
        assert!((peak - 440.0).abs() < 30.0);
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let mut analyzer = SpectrumAnalyzer::new(2048).unwrap();
        let frame: Vec<f32> = (0..2048)
            .map(|i| ((i * 7919) % 1000) as f32 / 1000.0 - 0.5)
            .collect();
        let first = analyzer.analyze(&frame, 44100).unwrap();
        let second = analyzer.analyze(&frame, 44100).unwrap();
        for (a, b) in first.spectrum.bins.iter().zip(&second.spectrum.bins) {
            assert_eq!(a.magnitude_db.to_bits(), b.magnitude_db.to_bits());
        }
        assert_eq!(first, second);
    }
}
