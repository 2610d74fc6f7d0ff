//! Playback redraw loop as an explicit `Idle -> Playing -> Idle` machine
//!
//! While playing, each frame is represented by a [`FrameTicket`]. The caller
//! queues the ticket for the next display refresh and hands it back through
//! [`RenderScheduler::begin_frame`] when it fires. Every stop bumps the
//! generation, so a ticket queued before a pause or end is recognized as
//! stale when it is dequeued and does nothing.

use crate::player::{PlayerPair, StreamRole};
use std::time::Duration;

/// Transitions reported by the playback widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    Play(StreamRole),
    Pause(StreamRole),
    Seeked(StreamRole),
    Ended(StreamRole),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulerState {
    #[default]
    Idle,
    Playing {
        generation: u64,
    },
}

/// Permission to run one playback frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
}

impl FrameTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What the caller should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    /// Nothing to do
    None,
    /// Loop started: queue this ticket for the next refresh
    Arm(FrameTicket),
    /// Draw one frame now at this player's position
    Redraw(StreamRole),
    /// Loop stopped: outstanding tickets are stale
    Stop,
}

/// Display-refresh driven scheduler for playback mode
#[derive(Debug, Clone)]
pub struct RenderScheduler {
    state: SchedulerState,
    generation: u64,
    frame_interval: Duration,
}

impl RenderScheduler {
    pub fn new(frame_rate_hz: u32) -> Self {
        let hz = frame_rate_hz.max(1);
        Self {
            state: SchedulerState::Idle,
            generation: 0,
            frame_interval: Duration::from_secs_f64(1.0 / hz as f64),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, SchedulerState::Playing { .. })
    }

    /// Delay between two playback frames
    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Apply a playback event.
    ///
    /// `players` reflects the state after the event.
    pub fn handle_event(&mut self, event: PlaybackEvent, players: &PlayerPair<'_>) -> ScheduleAction {
        match event {
            PlaybackEvent::Play(role) => {
                if self.is_playing() {
                    return ScheduleAction::None;
                }
                self.generation += 1;
                self.state = SchedulerState::Playing {
                    generation: self.generation,
                };
                tracing::info!(%role, generation = self.generation, "playback loop armed");
                ScheduleAction::Arm(FrameTicket {
                    generation: self.generation,
                })
            }
            PlaybackEvent::Pause(role) | PlaybackEvent::Ended(role) => {
                if !self.is_playing() {
                    return ScheduleAction::None;
                }
                // The other stream may still be running
                if players.any_playing() {
                    tracing::debug!(%role, "player stopped, other stream still playing");
                    return ScheduleAction::None;
                }
                self.stop();
                ScheduleAction::Stop
            }
            PlaybackEvent::Seeked(role) => ScheduleAction::Redraw(role),
        }
    }

    /// True while `ticket` belongs to the current playing generation
    pub fn should_run(&self, ticket: FrameTicket) -> bool {
        matches!(self.state, SchedulerState::Playing { generation } if generation == ticket.generation)
    }

    /// Called when a queued ticket fires.
    ///
    /// Returns the stream whose position to render, or `None` when the ticket
    /// is stale or nobody is playing anymore (the loop then goes idle).
    pub fn begin_frame(&mut self, ticket: FrameTicket, players: &PlayerPair<'_>) -> Option<StreamRole> {
        if !self.should_run(ticket) {
            tracing::debug!(generation = ticket.generation, "stale frame ticket ignored");
            return None;
        }
        if !players.any_playing() {
            self.stop();
            return None;
        }
        Some(players.authoritative())
    }

    /// Ticket for the following frame, if the loop is still running
    pub fn rearm(&self, ticket: FrameTicket) -> Option<FrameTicket> {
        self.should_run(ticket).then_some(ticket)
    }

    /// Go idle and invalidate every outstanding ticket
    pub fn stop(&mut self) {
        if self.is_playing() {
            tracing::info!(generation = self.generation, "playback loop idle");
        }
        self.generation += 1;
        self.state = SchedulerState::Idle;
    }
}

impl Default for RenderScheduler {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FRAME_RATE_HZ)
    }
}
