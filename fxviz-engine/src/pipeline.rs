//! Analysis session: buffers, track, analyzers and the redraw loop
//!
//! A [`Session`] owns everything one visualization needs. Live chunks and
//! processed files come in through [`Session::handle_message`]; playback
//! transitions through [`Session::playback_event`] and
//! [`Session::frame_tick`]. Every per-frame failure is logged, counted and
//! absorbed; the previous frame simply stays on screen.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::frame::{ChannelFrame, FrameSource, RenderFrame, RenderSink};
use crate::player::{PlayerPair, StreamRole};
use crate::ring::{LiveBuffers, SharedLiveBuffers};
use crate::scheduler::{FrameTicket, PlaybackEvent, RenderScheduler, ScheduleAction};
use crate::sync::PlaybackSynchronizer;
use crate::track::{FullTrack, TrackStore};
use fxviz_analysis::{ChromaExtractor, SpectrumAnalyzer, WaveformTrace};
use fxviz_transport::{InboundMessage, PlotData, TransportAdapter, TransportError};
use std::sync::Arc;
use std::time::Instant;

/// Counters for absorbed failures and completed work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub rendered_frames: u64,
    /// Render cycles abandoned after the input was accepted
    pub skipped_frames: u64,
    /// Live chunks rejected before reaching the buffers
    pub dropped_chunks: u64,
    /// Undecodable or inconsistent messages
    pub dropped_messages: u64,
    pub tracks_loaded: u64,
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum HandleOutcome {
    /// Live chunk stored and a frame delivered
    Rendered,
    /// Track replaced
    TrackLoaded(Arc<FullTrack>),
    /// Message rejected; buffers and track untouched
    Dropped(PipelineError),
    /// Input accepted but the render cycle was skipped
    Skipped(PipelineError),
}

pub struct Session {
    config: PipelineConfig,
    live: SharedLiveBuffers,
    tracks: Arc<TrackStore>,
    spectrum: SpectrumAnalyzer,
    chroma: ChromaExtractor,
    synchronizer: PlaybackSynchronizer,
    scheduler: RenderScheduler,
    last_render_at: Option<Instant>,
    stats: SessionStats,
}

impl Session {
    /// Create a session after validating `config`
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;

        let spectrum = SpectrumAnalyzer::new(config.fft_size)
            .map_err(|e| PipelineError::Config(e.to_string()))?
            .with_peak_min_freq(config.peak_min_freq_hz);
        let chroma = ChromaExtractor::new(config.chroma.clone())
            .map_err(|e| PipelineError::Config(e.to_string()))?;

        tracing::info!(
            ring_capacity = config.ring_capacity,
            fft_size = config.fft_size,
            lookahead_secs = config.lookahead_secs,
            "analysis session created"
        );

        Ok(Self {
            live: LiveBuffers::shared(config.ring_capacity),
            tracks: Arc::new(TrackStore::new()),
            spectrum,
            chroma,
            synchronizer: PlaybackSynchronizer::new(config.lookahead_secs),
            scheduler: RenderScheduler::new(config.frame_rate_hz),
            last_render_at: None,
            stats: SessionStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Time of the last delivered frame; stays put while cycles are skipped
    pub fn last_render_at(&self) -> Option<Instant> {
        self.last_render_at
    }

    /// Live buffers, for writers on another thread
    pub fn live_handle(&self) -> SharedLiveBuffers {
        Arc::clone(&self.live)
    }

    pub fn track_store(&self) -> Arc<TrackStore> {
        Arc::clone(&self.tracks)
    }

    pub fn scheduler(&self) -> &RenderScheduler {
        &self.scheduler
    }

    /// Push one live chunk pair into both buffers
    pub fn ingest(&self, plot: &PlotData) -> Result<(), PipelineError> {
        self.live
            .lock()
            .push_pair(&plot.input, &plot.output, plot.sample_rate)
    }

    /// Decode a raw text frame and handle it. Never fails on bad input.
    pub fn handle_text(&mut self, text: &str, sink: &mut dyn RenderSink) -> HandleOutcome {
        match TransportAdapter::decode(text) {
            Ok(msg) => self.handle_message(msg, sink),
            Err(e) => self.drop_message(e.into()),
        }
    }

    pub fn handle_message(&mut self, msg: InboundMessage, sink: &mut dyn RenderSink) -> HandleOutcome {
        match msg {
            InboundMessage::PlotData(plot) => {
                if let Err(e) = self.ingest(&plot) {
                    tracing::warn!(error = %e, "dropping live chunk");
                    self.stats.dropped_chunks += 1;
                    return HandleOutcome::Dropped(e);
                }
                match self.render_live() {
                    Ok(frame) => {
                        self.deliver(&frame, sink);
                        HandleOutcome::Rendered
                    }
                    Err(e) => {
                        self.absorb(&e);
                        HandleOutcome::Skipped(e)
                    }
                }
            }
            InboundMessage::FileProcessed(file) => {
                let track = match FullTrack::from_message(file) {
                    Ok(track) => Arc::new(track),
                    Err(e) => return self.drop_message(e),
                };
                self.load_track(Arc::clone(&track), sink);
                HandleOutcome::TrackLoaded(track)
            }
        }
    }

    /// Handle every queued transport message in arrival order.
    ///
    /// Returns one outcome per consumed frame, or `Disconnected` once the
    /// link is gone.
    pub fn drain(
        &mut self,
        adapter: &TransportAdapter,
        sink: &mut dyn RenderSink,
    ) -> Result<Vec<HandleOutcome>, PipelineError> {
        let mut outcomes = Vec::new();
        loop {
            let outcome = match adapter.try_recv() {
                Ok(Some(msg)) => self.handle_message(msg, sink),
                Ok(None) => return Ok(outcomes),
                Err(TransportError::Disconnected) => return Err(PipelineError::Disconnected),
                Err(e) => self.drop_message(e.into()),
            };
            outcomes.push(outcome);
        }
    }

    /// Replace the current track and draw its opening frame
    fn load_track(&mut self, track: Arc<FullTrack>, sink: &mut dyn RenderSink) {
        tracing::info!(
            samples = track.len(),
            sample_rate = track.sample_rate(),
            duration_secs = track.duration_secs(),
            "track loaded"
        );
        self.tracks.replace(track);
        self.stats.tracks_loaded += 1;
        // Players are rebuilt for the new track
        self.scheduler.stop();
        self.redraw_at(0.0, StreamRole::Original, sink);
    }

    /// Analyze the current live windows
    pub fn render_live(&mut self) -> Result<RenderFrame, PipelineError> {
        // Copy under the lock, analyze outside it
        let snapshot = self
            .live
            .lock()
            .snapshot()
            .ok_or(PipelineError::TransportUnavailable)?;

        self.analyze_pair(
            &snapshot.original,
            &snapshot.processed,
            snapshot.sample_rate,
            FrameSource::Live,
        )
    }

    /// Analyze the current track at a playback position
    pub fn render_at(&mut self, time: f64, role: StreamRole) -> Result<RenderFrame, PipelineError> {
        let track = self
            .tracks
            .current()
            .ok_or(PipelineError::TransportUnavailable)?;
        let window = self
            .synchronizer
            .window_at(time, &track, self.config.ring_capacity);

        self.analyze_pair(
            &window.original,
            &window.processed,
            track.sample_rate(),
            FrameSource::Playback { time, role },
        )
    }

    /// Apply a playback transition; a seek draws one frame right away
    pub fn playback_event(
        &mut self,
        event: PlaybackEvent,
        players: &PlayerPair<'_>,
        sink: &mut dyn RenderSink,
    ) -> ScheduleAction {
        let action = self.scheduler.handle_event(event, players);
        if let ScheduleAction::Redraw(role) = action {
            self.redraw_at(players.time_of(role), role, sink);
        }
        action
    }

    /// Run one playback frame for a queued ticket.
    ///
    /// Returns the ticket to queue next, or `None` once the loop is idle.
    /// A stale ticket does nothing.
    pub fn frame_tick(
        &mut self,
        ticket: FrameTicket,
        players: &PlayerPair<'_>,
        sink: &mut dyn RenderSink,
    ) -> Option<FrameTicket> {
        let role = self.scheduler.begin_frame(ticket, players)?;
        self.redraw_at(players.time_of(role), role, sink);
        self.scheduler.rearm(ticket)
    }

    fn redraw_at(&mut self, time: f64, role: StreamRole, sink: &mut dyn RenderSink) {
        match self.render_at(time, role) {
            Ok(frame) => self.deliver(&frame, sink),
            Err(e) => self.absorb(&e),
        }
    }

    fn analyze_pair(
        &mut self,
        original: &[f32],
        processed: &[f32],
        sample_rate: u32,
        source: FrameSource,
    ) -> Result<RenderFrame, PipelineError> {
        let original = self.analyze_channel(original, sample_rate)?;
        let processed = self.analyze_channel(processed, sample_rate)?;
        Ok(RenderFrame {
            source,
            sample_rate,
            original,
            processed,
        })
    }

    /// Trace over the whole window, spectrum and chroma over its newest
    /// `fft_size` samples
    fn analyze_channel(&mut self, window: &[f32], sample_rate: u32) -> Result<ChannelFrame, PipelineError> {
        let fft_size = self.config.fft_size;
        let frame = &window[window.len().saturating_sub(fft_size)..];
        let analysis = self.spectrum.analyze(frame, sample_rate)?;
        let chroma = self.chroma.extract(&analysis.linear, sample_rate, fft_size);

        Ok(ChannelFrame {
            trace: WaveformTrace::from_window(window, self.config.decimation_stride, sample_rate),
            spectrum: analysis.spectrum,
            peak_frequency: analysis.peak_frequency,
            chroma,
        })
    }

    fn deliver(&mut self, frame: &RenderFrame, sink: &mut dyn RenderSink) {
        sink.render(frame);
        self.last_render_at = Some(Instant::now());
        self.stats.rendered_frames += 1;
        tracing::debug!(
            source = ?frame.source,
            peak_original = ?frame.original.peak_frequency,
            peak_processed = ?frame.processed.peak_frequency,
            "frame rendered"
        );
    }

    fn absorb(&mut self, err: &PipelineError) {
        match err {
            // Nothing to draw yet; not a failure
            PipelineError::TransportUnavailable => tracing::debug!("no data to render yet"),
            _ => {
                tracing::warn!(error = %err, "skipping render cycle");
                self.stats.skipped_frames += 1;
            }
        }
    }

    fn drop_message(&mut self, err: PipelineError) -> HandleOutcome {
        tracing::warn!(error = %err, "dropping message");
        self.stats.dropped_messages += 1;
        HandleOutcome::Dropped(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::FixedPlayer;
    use fxviz_transport::FileProcessed;
    use std::f32::consts::PI;

    fn small_config() -> PipelineConfig {
        PipelineConfig {
            ring_capacity: 4096,
            fft_size: 2048,
            decimation_stride: 8,
            ..PipelineConfig::default()
        }
    }

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.fft_size = 3000;
        assert!(matches!(Session::new(config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_render_before_data_is_idle() {
        let mut session = Session::new(small_config()).unwrap();
        assert_eq!(session.render_live(), Err(PipelineError::TransportUnavailable));
        assert_eq!(
            session.render_at(0.0, StreamRole::Original),
            Err(PipelineError::TransportUnavailable)
        );
        assert!(session.last_render_at().is_none());
    }

    #[test]
    fn test_live_chunk_renders_once() {
        let mut session = Session::new(small_config()).unwrap();
        let mut frames: Vec<RenderFrame> = Vec::new();
        // Centered on bin 19 of a 2048-point transform, inside the A band
        let tone = 19.0 * 48000.0 / 2048.0;
        let plot = PlotData {
            input: sine(tone, 48000, 4096),
            output: vec![0.0; 4096],
            sample_rate: 48000,
        };

        let outcome = session.handle_message(InboundMessage::PlotData(plot), &mut frames);
        assert_eq!(outcome, HandleOutcome::Rendered);
        assert_eq!(frames.len(), 1);

        let frame = &frames[0];
        assert_eq!(frame.source, FrameSource::Live);
        assert_eq!(frame.original.trace.len(), 4096 / 8);
        assert_eq!(frame.original.spectrum.len(), 2048 / 2 + 1);
        let peak = frame.original.peak_frequency.unwrap();
        assert!((peak - tone).abs() < 48000.0 / 2048.0 * 2.0, "peak {}", peak);
        assert_eq!(frame.original.chroma.dominant_name(), Some("A"));
        assert!(session.last_render_at().is_some());
    }

    #[test]
    fn test_oversized_chunk_dropped() {
        let mut session = Session::new(small_config()).unwrap();
        let mut frames: Vec<RenderFrame> = Vec::new();
        let plot = PlotData {
            input: vec![0.5; 5000],
            output: vec![0.5; 5000],
            sample_rate: 48000,
        };
        let outcome = session.handle_message(InboundMessage::PlotData(plot), &mut frames);
        assert!(matches!(
            outcome,
            HandleOutcome::Dropped(PipelineError::InvalidChunkSize {
                chunk: 5000,
                capacity: 4096
            })
        ));
        assert!(frames.is_empty());
        assert_eq!(session.stats().dropped_chunks, 1);
        assert!(session.live_handle().lock().snapshot().is_none());
    }

    #[test]
    fn test_garbage_text_is_absorbed() {
        let mut session = Session::new(small_config()).unwrap();
        let mut frames: Vec<RenderFrame> = Vec::new();
        for text in ["not json", r#"{"type":"mystery"}"#, r#"{"type":"plot_data","input":[1],"output":[],"sample_rate":48000}"#] {
            let outcome = session.handle_text(text, &mut frames);
            assert!(
                matches!(outcome, HandleOutcome::Dropped(PipelineError::MalformedMessage(_))),
                "{} -> {:?}",
                text,
                outcome
            );
        }
        assert_eq!(session.stats().dropped_messages, 3);
        assert!(frames.is_empty());
    }

    #[test]
    fn test_file_processed_draws_opening_frame() {
        let mut session = Session::new(small_config()).unwrap();
        let mut frames: Vec<RenderFrame> = Vec::new();
        let file = FileProcessed {
            original_samples: sine(440.0, 48000, 48000),
            processed_samples: sine(880.0, 48000, 48000),
            sample_rate: 48000,
            original_audio: None,
            processed_audio: None,
        };

        let outcome = session.handle_message(InboundMessage::FileProcessed(file), &mut frames);
        let HandleOutcome::TrackLoaded(track) = outcome else {
            panic!("expected a loaded track");
        };
        assert_eq!(track.len(), 48000);
        assert_eq!(session.stats().tracks_loaded, 1);
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].source,
            FrameSource::Playback {
                time: 0.0,
                role: StreamRole::Original
            }
        );
    }

    #[test]
    fn test_seek_redraws_while_paused() {
        let mut session = Session::new(small_config()).unwrap();
        let mut frames: Vec<RenderFrame> = Vec::new();
        let track = FullTrack::new(vec![0.1; 48000], vec![0.2; 48000], 48000).unwrap();
        session.track_store().replace(Arc::new(track));

        let a = FixedPlayer::paused(0.5);
        let b = FixedPlayer::paused(0.0);
        let action = session.playback_event(
            PlaybackEvent::Seeked(StreamRole::Original),
            &PlayerPair::new(&a, &b),
            &mut frames,
        );
        assert_eq!(action, ScheduleAction::Redraw(StreamRole::Original));
        assert_eq!(frames.len(), 1);
        assert!(!session.scheduler().is_playing());
    }
}
