//! Playback position sources for the original and processed streams

use std::fmt;
use std::time::Instant;

/// Which of the two streams a player or frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StreamRole {
    #[default]
    Original,
    Processed,
}

impl StreamRole {
    pub fn name(&self) -> &'static str {
        match self {
            StreamRole::Original => "original",
            StreamRole::Processed => "processed",
        }
    }

    /// The opposite stream
    pub fn other(self) -> Self {
        match self {
            StreamRole::Original => StreamRole::Processed,
            StreamRole::Processed => StreamRole::Original,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "original" | "orig" | "o" => Some(StreamRole::Original),
            "processed" | "proc" | "p" => Some(StreamRole::Processed),
            _ => None,
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of a playback widget
pub trait Player {
    /// Playback position in seconds
    fn current_time(&self) -> f64;
    fn is_paused(&self) -> bool;
    fn has_ended(&self) -> bool;
    /// Track length in seconds
    fn duration(&self) -> f64;
}

/// Playback state for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Player driven by the monotonic clock.
///
/// The position is `offset + (now - started_at)` while playing and is clamped
/// to the duration. Every query has an `_at` variant taking the instant
/// explicitly.
#[derive(Debug, Clone)]
pub struct ClockPlayer {
    duration: f64,
    state: PlaybackState,
    /// Position when playback last started or the player was last paused/seeked
    offset: f64,
    started_at: Option<Instant>,
}

impl ClockPlayer {
    pub fn new(duration_secs: f64) -> Self {
        Self {
            duration: duration_secs.max(0.0),
            state: PlaybackState::Stopped,
            offset: 0.0,
            started_at: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Start playback
    pub fn play(&mut self) {
        self.play_at(Instant::now());
    }

    pub fn play_at(&mut self, now: Instant) {
        if self.is_playing() {
            return;
        }
        // Restart from the top once the end was reached
        if self.offset >= self.duration {
            self.offset = 0.0;
        }
        self.state = PlaybackState::Playing;
        self.started_at = Some(now);
    }

    /// Pause playback
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    pub fn pause_at(&mut self, now: Instant) {
        self.offset = self.position_at(now);
        self.started_at = None;
        self.state = PlaybackState::Paused;
    }

    /// Stop playback and reset position
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.offset = 0.0;
        self.started_at = None;
    }

    /// Set playback position in seconds
    pub fn seek(&mut self, position_secs: f64) {
        self.seek_at(position_secs, Instant::now());
    }

    pub fn seek_at(&mut self, position_secs: f64, now: Instant) {
        let target = if position_secs.is_finite() {
            position_secs.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.offset = target;
        if self.is_playing() {
            self.started_at = Some(now);
        }
    }

    /// Position in seconds at `now`
    pub fn position_at(&self, now: Instant) -> f64 {
        let elapsed = match (self.state, self.started_at) {
            (PlaybackState::Playing, Some(start)) => {
                now.saturating_duration_since(start).as_secs_f64()
            }
            _ => 0.0,
        };
        (self.offset + elapsed).min(self.duration)
    }

    pub fn ended_at(&self, now: Instant) -> bool {
        self.is_playing() && self.position_at(now) >= self.duration
    }
}

impl Player for ClockPlayer {
    fn current_time(&self) -> f64 {
        self.position_at(Instant::now())
    }

    fn is_paused(&self) -> bool {
        !self.is_playing() || self.ended_at(Instant::now())
    }

    fn has_ended(&self) -> bool {
        self.ended_at(Instant::now())
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

/// The original and processed players, in that order
#[derive(Clone, Copy)]
pub struct PlayerPair<'a> {
    pub original: &'a dyn Player,
    pub processed: &'a dyn Player,
}

impl<'a> PlayerPair<'a> {
    pub fn new(original: &'a dyn Player, processed: &'a dyn Player) -> Self {
        Self {
            original,
            processed,
        }
    }

    pub fn get(&self, role: StreamRole) -> &'a dyn Player {
        match role {
            StreamRole::Original => self.original,
            StreamRole::Processed => self.processed,
        }
    }

    /// Any player currently playing
    pub fn any_playing(&self) -> bool {
        !self.original.is_paused() || !self.processed.is_paused()
    }

    /// Player whose position drives the display.
    ///
    /// An unpaused player wins over a paused one; when both are unpaused the
    /// original stream wins. With both paused, the original stream is used.
    pub fn authoritative(&self) -> StreamRole {
        if self.original.is_paused() && !self.processed.is_paused() {
            StreamRole::Processed
        } else {
            StreamRole::Original
        }
    }

    pub fn time_of(&self, role: StreamRole) -> f64 {
        self.get(role).current_time()
    }
}

/// Fixed-position player for tests and offline rendering
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FixedPlayer {
    pub time: f64,
    pub paused: bool,
    pub ended: bool,
    pub duration: f64,
}

impl FixedPlayer {
    pub fn playing(time: f64) -> Self {
        Self {
            time,
            paused: false,
            ended: false,
            duration: f64::MAX,
        }
    }

    pub fn paused(time: f64) -> Self {
        Self {
            paused: true,
            ..Self::playing(time)
        }
    }
}

impl Player for FixedPlayer {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_clock_player_advances_only_while_playing() {
        let t0 = Instant::now();
        let mut player = ClockPlayer::new(10.0);
        assert_eq!(player.position_at(t0 + Duration::from_secs(1)), 0.0);

        player.play_at(t0);
        assert!((player.position_at(t0 + Duration::from_millis(1500)) - 1.5).abs() < 1e-9);

        player.pause_at(t0 + Duration::from_secs(2));
        assert_eq!(player.state(), PlaybackState::Paused);
        assert!((player.position_at(t0 + Duration::from_secs(5)) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_clamps_and_keeps_running() {
        let t0 = Instant::now();
        let mut player = ClockPlayer::new(4.0);
        player.play_at(t0);
        player.seek_at(3.0, t0 + Duration::from_secs(1));
        assert!((player.position_at(t0 + Duration::from_millis(1500)) - 3.5).abs() < 1e-9);

        player.seek_at(99.0, t0);
        assert_eq!(player.position_at(t0), 4.0);
        player.seek_at(f64::NAN, t0);
        assert_eq!(player.position_at(t0), 0.0);
    }

    #[test]
    fn test_reaches_end() {
        let t0 = Instant::now();
        let mut player = ClockPlayer::new(1.0);
        player.play_at(t0);
        let later = t0 + Duration::from_secs(3);
        assert!(player.ended_at(later));
        assert_eq!(player.position_at(later), 1.0);

        player.pause_at(later);
        player.play_at(later);
        assert_eq!(player.position_at(later), 0.0, "replay starts from the top");
    }

    #[test]
    fn test_stop_resets() {
        let t0 = Instant::now();
        let mut player = ClockPlayer::new(5.0);
        player.play_at(t0);
        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.position_at(t0 + Duration::from_secs(2)), 0.0);
        assert!(player.is_paused());
    }

    #[test]
    fn test_authoritative_prefers_unpaused() {
        let playing = FixedPlayer::playing(1.0);
        let paused = FixedPlayer::paused(7.0);

        let pair = PlayerPair::new(&paused, &playing);
        assert_eq!(pair.authoritative(), StreamRole::Processed);
        assert_eq!(pair.time_of(pair.authoritative()), 1.0);

        let pair = PlayerPair::new(&playing, &paused);
        assert_eq!(pair.authoritative(), StreamRole::Original);
    }

    #[test]
    fn test_both_playing_original_wins() {
        let a = FixedPlayer::playing(1.0);
        let b = FixedPlayer::playing(2.0);
        let pair = PlayerPair::new(&a, &b);
        assert_eq!(pair.authoritative(), StreamRole::Original);
        assert!(pair.any_playing());

        let c = FixedPlayer::paused(0.0);
        let d = FixedPlayer::paused(0.0);
        assert!(!PlayerPair::new(&c, &d).any_playing());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(StreamRole::parse("processed"), Some(StreamRole::Processed));
        assert_eq!(StreamRole::parse("o"), Some(StreamRole::Original));
        assert_eq!(StreamRole::parse("wet"), None);
        assert_eq!(StreamRole::Processed.to_string(), "processed");
        assert_eq!(StreamRole::Original.other(), StreamRole::Processed);
    }
}
