//! Signal analysis for fxviz
//!
//! Pure numeric kernels used by the render pipeline: Blackman-Harris windowed
//! spectrum in dB, 12-class chroma extraction, and waveform decimation.

mod chroma;
mod error;
mod spectrum;
mod waveform;
mod window;

pub use chroma::{
    frequency_to_midi, pitch_class_of, ChromaConfig, ChromaExtractor, ChromaVector,
    PITCH_CLASSES, PITCH_CLASS_NAMES,
};
pub use error::AnalysisError;
pub use spectrum::{
    Spectrum, SpectrumAnalysis, SpectrumAnalyzer, SpectrumBin, DEFAULT_FFT_SIZE,
    DEFAULT_PEAK_MIN_FREQ,
};
pub use waveform::{decimate, decimated_len, WaveformTrace, DEFAULT_DECIMATION_STRIDE};
pub use window::blackman_harris;
