//! Pitch-class energy histogram (chroma) from a linear magnitude spectrum
//!
//! Each bin is mapped to its nearest equal-tempered note:
//! 1. Gate bins by frequency range and by a threshold relative to the loudest bin
//! 2. De-weight higher frequencies so upper partials don't swamp the fundamental
//! 3. Fold `12 * log2(f / 440) + 69` onto the 12 pitch classes
//! 4. Normalize to the strongest class and sharpen with a power curve
//!
//! Tuned for single notes and guitar-like harmonic content. Dense polyphony or
//! noise smears energy across neighbouring classes; that is a known limitation
//! of the heuristic.

use crate::error::AnalysisError;

/// Number of pitch classes
pub const PITCH_CLASSES: usize = 12;

/// Display labels, index 0 = C
pub const PITCH_CLASS_NAMES: [&str; PITCH_CLASSES] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference frequency for A4 (440 Hz)
const A4_FREQ: f32 = 440.0;
/// MIDI note number of A4
const A4_MIDI: f32 = 69.0;

/// Tunables for chroma extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ChromaConfig {
    /// Bins below this frequency are rumble
    pub min_freq_hz: f32,
    /// Hard high cutoff (exclusive)
    pub max_freq_hz: f32,
    /// Fraction of the loudest bin a weighted bin must reach
    pub threshold_ratio: f32,
    /// Weight for `f <= low_cutoff_hz`
    pub low_cutoff_hz: f32,
    pub low_weight: f32,
    /// Weight for `low_cutoff_hz < f <= mid_cutoff_hz`
    pub mid_cutoff_hz: f32,
    pub mid_weight: f32,
    /// Weight above `mid_cutoff_hz`
    pub high_weight: f32,
    /// Max distance from the nearest note, in semitones (inclusive)
    pub tolerance_semitones: f32,
    /// Power applied after normalization
    pub sharpen_exponent: i32,
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            min_freq_hz: 70.0,
            max_freq_hz: 5000.0,
            threshold_ratio: 0.15,
            low_cutoff_hz: 800.0,
            low_weight: 1.0,
            mid_cutoff_hz: 1500.0,
            mid_weight: 0.5,
            high_weight: 0.1,
            tolerance_semitones: 0.5,
            sharpen_exponent: 3,
        }
    }
}

impl ChromaConfig {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.min_freq_hz >= 0.0 && self.min_freq_hz < self.max_freq_hz) {
            return Err(AnalysisError::InvalidConfig(format!(
                "chroma frequency range {}..{} Hz is empty",
                self.min_freq_hz, self.max_freq_hz
            )));
        }
        if !(0.0..1.0).contains(&self.threshold_ratio) {
            return Err(AnalysisError::InvalidConfig(format!(
                "chroma threshold ratio {} outside [0, 1)",
                self.threshold_ratio
            )));
        }
        if self.low_cutoff_hz > self.mid_cutoff_hz {
            return Err(AnalysisError::InvalidConfig(
                "chroma weight cutoffs must be increasing".into(),
            ));
        }
        if !(self.tolerance_semitones > 0.0 && self.tolerance_semitones <= 0.5) {
            return Err(AnalysisError::InvalidConfig(format!(
                "chroma tolerance {} outside (0, 0.5]",
                self.tolerance_semitones
            )));
        }
        if self.sharpen_exponent < 1 {
            return Err(AnalysisError::InvalidConfig(
                "chroma sharpen exponent must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

/// 12 normalized pitch-class energies, index 0 = C
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChromaVector {
    pub values: [f32; PITCH_CLASSES],
}

impl ChromaVector {
    /// Strongest class as `(index, value)`, `None` when all classes are zero
    pub fn dominant(&self) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            if v <= 0.0 {
                continue;
            }
            match best {
                Some((_, best_v)) if v <= best_v => {}
                _ => best = Some((i, v)),
            }
        }
        best
    }

    /// Name of the strongest class
    pub fn dominant_name(&self) -> Option<&'static str> {
        self.dominant().map(|(i, _)| PITCH_CLASS_NAMES[i])
    }

    /// `(label, value)` pairs in C..B order
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        PITCH_CLASS_NAMES.iter().copied().zip(self.values.iter().copied())
    }
}

/// Continuous MIDI note number for a frequency (69 = A4)
#[inline]
pub fn frequency_to_midi(freq: f32) -> f32 {
    12.0 * (freq / A4_FREQ).log2() + A4_MIDI
}

/// Reduce a (possibly negative) note number to 0..11
#[inline]
pub fn pitch_class_of(note: i32) -> usize {
    note.rem_euclid(PITCH_CLASSES as i32) as usize
}

/// Pre-computed bin-to-pitch-class mapping for one (sample rate, N) pair
#[derive(Debug, Clone)]
struct BinMap {
    sample_rate: u32,
    fft_size: usize,
    /// `None` for bins outside the range or too far from any note
    classes: Vec<Option<u8>>,
    weights: Vec<f32>,
}

/// Chroma extractor over linear magnitude spectra
pub struct ChromaExtractor {
    config: ChromaConfig,
    /// Rebuilt only when the sample rate or transform size changes
    bin_map: Option<BinMap>,
}

impl ChromaExtractor {
    pub fn new(config: ChromaConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            bin_map: None,
        })
    }

    pub fn config(&self) -> &ChromaConfig {
        &self.config
    }

    /// Perceptual de-weighting for a bin frequency
    pub fn weight_for(&self, freq: f32) -> f32 {
        if freq <= self.config.low_cutoff_hz {
            self.config.low_weight
        } else if freq <= self.config.mid_cutoff_hz {
            self.config.mid_weight
        } else {
            self.config.high_weight
        }
    }

    /// Pitch class of a frequency, or `None` when it lies more than the
    /// tolerance away from the nearest note.
    pub fn pitch_class(&self, freq: f32) -> Option<usize> {
        let midi = frequency_to_midi(freq);
        let nearest = midi.round();
        let deviation = (midi - nearest).abs();
        if deviation > self.config.tolerance_semitones {
            return None;
        }
        Some(pitch_class_of(nearest as i32))
    }

    fn build_bin_map(&self, bin_count: usize, sample_rate: u32, fft_size: usize) -> BinMap {
        let mut classes = Vec::with_capacity(bin_count);
        let mut weights = Vec::with_capacity(bin_count);

        for bin in 0..bin_count {
            let freq = bin as f32 * sample_rate as f32 / fft_size as f32;

            if bin == 0 || freq < self.config.min_freq_hz || freq >= self.config.max_freq_hz {
                classes.push(None);
                weights.push(0.0);
                continue;
            }

            classes.push(self.pitch_class(freq).map(|pc| pc as u8));
            weights.push(self.weight_for(freq));
        }

        BinMap {
            sample_rate,
            fft_size,
            classes,
            weights,
        }
    }

    /// Extract a chroma vector from `|X[k]|` magnitudes of a length-`fft_size`
    /// transform (bins `0..=fft_size/2`).
    ///
    /// Recomputed from scratch on every call; nothing accumulates across frames.
    pub fn extract(&mut self, linear: &[f32], sample_rate: u32, fft_size: usize) -> ChromaVector {
        if linear.is_empty() || sample_rate == 0 || fft_size == 0 {
            return ChromaVector::default();
        }

        let stale = match &self.bin_map {
            Some(map) => {
                map.sample_rate != sample_rate
                    || map.fft_size != fft_size
                    || map.classes.len() != linear.len()
            }
            None => true,
        };
        if stale {
            tracing::debug!(sample_rate, fft_size, bins = linear.len(), "rebuilding chroma bin map");
            self.bin_map = Some(self.build_bin_map(linear.len(), sample_rate, fft_size));
        }
        let Some(map) = self.bin_map.as_ref() else {
            return ChromaVector::default();
        };

        let max_mag = linear.iter().copied().fold(0.0f32, f32::max);
        let threshold = self.config.threshold_ratio * max_mag;

        let mut chroma = [0.0f32; PITCH_CLASSES];
        for ((&magnitude, class), &weight) in linear.iter().zip(&map.classes).zip(&map.weights) {
            let Some(pc) = class else {
                continue;
            };
            let weighted = magnitude * weight;
            if weighted < threshold {
                continue;
            }
            chroma[*pc as usize] += weighted;
        }

        let peak = chroma.iter().copied().fold(0.0f32, f32::max) + 1e-9;
        for v in &mut chroma {
            *v = (*v / peak).powi(self.config.sharpen_exponent);
        }

        ChromaVector { values: chroma }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SpectrumAnalyzer;
    use std::f32::consts::PI;

    fn extractor() -> ChromaExtractor {
        ChromaExtractor::new(ChromaConfig::default()).unwrap()
    }

    fn sine_frame(freqs: &[f32], sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                freqs.iter().map(|f| (2.0 * PI * f * t).sin()).sum::<f32>() / freqs.len() as f32
            })
            .collect()
    }

    fn chroma_of(freqs: &[f32]) -> ChromaVector {
        let sample_rate = 48000;
        let n = 16384;
        let mut analyzer = SpectrumAnalyzer::new(n).unwrap();
        let analysis = analyzer
            .analyze(&sine_frame(freqs, sample_rate, n), sample_rate)
            .unwrap();
        extractor().extract(&analysis.linear, sample_rate, n)
    }

    #[test]
    fn test_midi_mapping() {
        assert!((frequency_to_midi(440.0) - 69.0).abs() < 1e-4);
        assert!((frequency_to_midi(880.0) - 81.0).abs() < 1e-4);
        assert!((frequency_to_midi(261.63) - 60.0).abs() < 0.01);
    }

    #[test]
    fn test_pitch_class_wraps_negative_notes() {
        assert_eq!(pitch_class_of(-1), 11);
        assert_eq!(pitch_class_of(-12), 0);
        assert_eq!(pitch_class_of(69), 9);
    }

    #[test]
    fn test_weight_bands() {
        let ex = extractor();
        assert_eq!(ex.weight_for(440.0), 1.0);
        assert_eq!(ex.weight_for(800.0), 1.0);
        assert_eq!(ex.weight_for(1000.0), 0.5);
        assert_eq!(ex.weight_for(1500.0), 0.5);
        assert_eq!(ex.weight_for(3000.0), 0.1);
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let mut config = ChromaConfig::default();
        config.tolerance_semitones = 0.25;
        let ex = ChromaExtractor::new(config).unwrap();
        // Just inside the bound above A4
        let quarter_up = 440.0 * 2f32.powf(0.24 / 12.0);
        assert_eq!(ex.pitch_class(quarter_up), Some(9));
        let too_far = 440.0 * 2f32.powf(0.3 / 12.0);
        assert_eq!(ex.pitch_class(too_far), None);
    }

    #[test]
    fn test_a440_is_unique_maximum() {
        let chroma = chroma_of(&[440.0]);
        let (idx, value) = chroma.dominant().unwrap();
        assert_eq!(PITCH_CLASS_NAMES[idx], "A");
        assert!((value - 1.0).abs() < 1e-3);
        for (i, &v) in chroma.values.iter().enumerate() {
            if i != idx {
                assert!(v <= 0.05, "class {} = {} should be near zero", PITCH_CLASS_NAMES[i], v);
            }
        }
    }

    #[test]
    fn test_c_major_triad_classes() {
        let chroma = chroma_of(&[261.63, 329.63, 392.0]);
        for name in ["C", "E", "G"] {
            let idx = PITCH_CLASS_NAMES.iter().position(|n| *n == name).unwrap();
            assert!(chroma.values[idx] > 0.5, "{} should be strong", name);
        }
        let d_sharp = PITCH_CLASS_NAMES.iter().position(|n| *n == "D#").unwrap();
        assert!(chroma.values[d_sharp] < 0.05);
    }

    #[test]
    fn test_rumble_and_high_cutoff_ignored() {
        // 50 Hz hum and a 6 kHz whistle both fall outside the chroma range
        let chroma = chroma_of(&[50.0, 6000.0]);
        assert!(chroma.dominant().is_none());
    }

    #[test]
    fn test_silence_yields_zero_vector() {
        let mut ex = extractor();
        let chroma = ex.extract(&vec![0.0; 8193], 48000, 16384);
        assert_eq!(chroma, ChromaVector::default());
    }

    #[test]
    fn test_not_cumulative_across_frames() {
        let mut ex = extractor();
        let sample_rate = 48000;
        let n = 16384;
        let mut analyzer = SpectrumAnalyzer::new(n).unwrap();
        let a = analyzer
            .analyze(&sine_frame(&[440.0], sample_rate, n), sample_rate)
            .unwrap();
        let c = analyzer
            .analyze(&sine_frame(&[261.63], sample_rate, n), sample_rate)
            .unwrap();

        let _ = ex.extract(&a.linear, sample_rate, n);
        let second = ex.extract(&c.linear, sample_rate, n);
        assert_eq!(second.dominant_name(), Some("C"));
        assert!(second.values[9] < 0.05, "A from the previous frame must not leak");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ChromaConfig::default();
        config.tolerance_semitones = 0.6;
        assert!(ChromaExtractor::new(config).is_err());

        let mut config = ChromaConfig::default();
        config.threshold_ratio = 1.5;
        assert!(ChromaExtractor::new(config).is_err());
    }

    #[test]
    fn test_labeled_order() {
        let labels: Vec<&str> = ChromaVector::default().labeled().map(|(n, _)| n).collect();
        assert_eq!(labels.first(), Some(&"C"));
        assert_eq!(labels.last(), Some(&"B"));
        assert_eq!(labels.len(), 12);
    }
}
