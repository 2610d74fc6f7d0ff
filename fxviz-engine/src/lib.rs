//! Session-scoped analysis pipeline for fxviz
//!
//! This module ties the analysis kernels to the message boundary:
//! - Ring: sliding live windows for the original and processed streams
//! - Track: the last fully processed file, replaced wholesale
//! - Sync: latency-compensated playback windows
//! - Scheduler: the `Idle -> Playing -> Idle` redraw loop
//! - Pipeline: the `Session` that owns all of the above

mod config;
mod error;
mod frame;
mod pipeline;
mod player;
mod ring;
mod scheduler;
mod sync;
mod track;

pub use config::{PipelineConfig, DEFAULT_FRAME_RATE_HZ, DEFAULT_LOOKAHEAD_SECS, DEFAULT_RING_CAPACITY};
pub use error::PipelineError;
pub use frame::{ChannelFrame, FrameSource, RenderFrame, RenderSink};
pub use pipeline::{HandleOutcome, Session, SessionStats};
pub use player::{ClockPlayer, FixedPlayer, PlaybackState, Player, PlayerPair, StreamRole};
pub use ring::{LiveBuffers, LiveSnapshot, RingBuffer, SharedLiveBuffers};
pub use scheduler::{FrameTicket, PlaybackEvent, RenderScheduler, ScheduleAction, SchedulerState};
pub use sync::{AlignedWindow, PlaybackSynchronizer};
pub use track::{FullTrack, TrackStore};
