//! Pipeline tunables and their persistence
//!
//! Stored as plain `key=value` lines at `<config dir>/fxviz/config.txt`.

use crate::error::PipelineError;
use fxviz_analysis::{ChromaConfig, DEFAULT_DECIMATION_STRIDE, DEFAULT_FFT_SIZE, DEFAULT_PEAK_MIN_FREQ};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default ring capacity (~2.7 s at 48 kHz)
pub const DEFAULT_RING_CAPACITY: usize = 131072;

/// Default playback look-ahead in seconds
pub const DEFAULT_LOOKAHEAD_SECS: f64 = 0.12;

/// Default redraw rate while playing
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Every tunable of the analysis pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Samples kept per live stream; also the playback display window
    pub ring_capacity: usize,
    /// Transform length
    pub fft_size: usize,
    /// Added to the playback position before slicing
    pub lookahead_secs: f64,
    /// Keep every Nth sample of the waveform trace
    pub decimation_stride: usize,
    /// Redraws per second while a player is playing
    pub frame_rate_hz: u32,
    /// Peak search floor
    pub peak_min_freq_hz: f32,
    pub chroma: ChromaConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ring_capacity: DEFAULT_RING_CAPACITY,
            fft_size: DEFAULT_FFT_SIZE,
            lookahead_secs: DEFAULT_LOOKAHEAD_SECS,
            decimation_stride: DEFAULT_DECIMATION_STRIDE,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            peak_min_freq_hz: DEFAULT_PEAK_MIN_FREQ,
            chroma: ChromaConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        let path = Self::config_path();
        Self::load_from(&path).unwrap_or_default()
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(Self::parse(&content))
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fxviz")
            .join("config.txt")
    }

    /// Check the invariants the pipeline relies on
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(PipelineError::Config(format!(
                "fft_size must be a power of two, got {}",
                self.fft_size
            )));
        }
        if !self.ring_capacity.is_power_of_two() {
            return Err(PipelineError::Config(format!(
                "ring_capacity must be a power of two, got {}",
                self.ring_capacity
            )));
        }
        if self.ring_capacity < self.fft_size {
            return Err(PipelineError::Config(format!(
                "ring_capacity {} is smaller than fft_size {}",
                self.ring_capacity, self.fft_size
            )));
        }
        if self.decimation_stride == 0 {
            return Err(PipelineError::Config("decimation_stride must be >= 1".into()));
        }
        if !(self.lookahead_secs.is_finite() && self.lookahead_secs >= 0.0) {
            return Err(PipelineError::Config(format!(
                "lookahead_secs must be >= 0, got {}",
                self.lookahead_secs
            )));
        }
        if self.frame_rate_hz == 0 {
            return Err(PipelineError::Config("frame_rate_hz must be >= 1".into()));
        }
        self.chroma
            .validate()
            .map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Parse config from simple key=value format
    ///
    /// Unknown keys are ignored; bad values keep their default.
    fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let c = &mut config;

            match key {
                "ring_capacity" => set(&mut c.ring_capacity, key, value),
                "fft_size" => set(&mut c.fft_size, key, value),
                "lookahead_secs" => set(&mut c.lookahead_secs, key, value),
                "decimation_stride" => set(&mut c.decimation_stride, key, value),
                "frame_rate_hz" => set(&mut c.frame_rate_hz, key, value),
                "peak_min_freq_hz" => set(&mut c.peak_min_freq_hz, key, value),
                "chroma.min_freq_hz" => set(&mut c.chroma.min_freq_hz, key, value),
                "chroma.max_freq_hz" => set(&mut c.chroma.max_freq_hz, key, value),
                "chroma.threshold_ratio" => set(&mut c.chroma.threshold_ratio, key, value),
                "chroma.low_cutoff_hz" => set(&mut c.chroma.low_cutoff_hz, key, value),
                "chroma.low_weight" => set(&mut c.chroma.low_weight, key, value),
                "chroma.mid_cutoff_hz" => set(&mut c.chroma.mid_cutoff_hz, key, value),
                "chroma.mid_weight" => set(&mut c.chroma.mid_weight, key, value),
                "chroma.high_weight" => set(&mut c.chroma.high_weight, key, value),
                "chroma.tolerance_semitones" => {
                    set(&mut c.chroma.tolerance_semitones, key, value)
                }
                "chroma.sharpen_exponent" => set(&mut c.chroma.sharpen_exponent, key, value),
                _ => {} // Ignore unknown keys
            }
        }

        config
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let ch = &self.chroma;
        let lines = [
            "# fxviz configuration".to_string(),
            format!("ring_capacity={}", self.ring_capacity),
            format!("fft_size={}", self.fft_size),
            format!("lookahead_secs={}", self.lookahead_secs),
            format!("decimation_stride={}", self.decimation_stride),
            format!("frame_rate_hz={}", self.frame_rate_hz),
            format!("peak_min_freq_hz={}", self.peak_min_freq_hz),
            format!("chroma.min_freq_hz={}", ch.min_freq_hz),
            format!("chroma.max_freq_hz={}", ch.max_freq_hz),
            format!("chroma.threshold_ratio={}", ch.threshold_ratio),
            format!("chroma.low_cutoff_hz={}", ch.low_cutoff_hz),
            format!("chroma.low_weight={}", ch.low_weight),
            format!("chroma.mid_cutoff_hz={}", ch.mid_cutoff_hz),
            format!("chroma.mid_weight={}", ch.mid_weight),
            format!("chroma.high_weight={}", ch.high_weight),
            format!("chroma.tolerance_semitones={}", ch.tolerance_semitones),
            format!("chroma.sharpen_exponent={}", ch.sharpen_exponent),
        ];
        lines.join("\n")
    }
}

fn set<T: FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.parse() {
        Ok(v) => *slot = v,
        Err(_) => tracing::warn!(key, value, "ignoring unparseable config value"),
    }
}
