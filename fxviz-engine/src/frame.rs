//! Display-ready output of one render cycle

use crate::player::StreamRole;
use fxviz_analysis::{ChromaVector, Spectrum, WaveformTrace};

/// Where the analyzed window came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSource {
    Live,
    Playback { time: f64, role: StreamRole },
}

/// Everything drawn for one stream
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    pub trace: WaveformTrace,
    pub spectrum: Spectrum,
    pub peak_frequency: Option<f32>,
    pub chroma: ChromaVector,
}

/// Three display series for both streams
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub source: FrameSource,
    pub sample_rate: u32,
    pub original: ChannelFrame,
    pub processed: ChannelFrame,
}

impl RenderFrame {
    pub fn channel(&self, role: StreamRole) -> &ChannelFrame {
        match role {
            StreamRole::Original => &self.original,
            StreamRole::Processed => &self.processed,
        }
    }
}

/// Downstream display boundary
pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame);
}

impl<F: FnMut(&RenderFrame)> RenderSink for F {
    fn render(&mut self, frame: &RenderFrame) {
        self(frame)
    }
}

/// Collects frames, mostly for tests
impl RenderSink for Vec<RenderFrame> {
    fn render(&mut self, frame: &RenderFrame) {
        self.push(frame.clone());
    }
}
