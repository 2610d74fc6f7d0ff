//! fxviz - effect audition analyzer
//!
//! Reads engine messages and console commands from stdin, renders spectrum,
//! chroma and waveform frames, and writes engine commands to stdout.

mod commands;

use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{after, never, select, unbounded, Receiver, Sender};
use tracing_subscriber::EnvFilter;

use commands::{Command, HELP};
use fxviz_engine::{
    ChannelFrame, ClockPlayer, FrameSource, FrameTicket, HandleOutcome, PipelineConfig, PlaybackEvent, Player,
    PlayerPair, RenderFrame, RenderSink, ScheduleAction, Session, StreamRole,
};
use fxviz_transport::{TransportAdapter, DEFAULT_QUEUE_CAPACITY};

fn main() -> anyhow::Result<()> {
    // stdout carries engine commands, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = PipelineConfig::load();
    let session = Session::new(config)?;
    tracing::info!(path = %PipelineConfig::config_path().display(), "config loaded");

    let (adapter, link) = TransportAdapter::create_channels(DEFAULT_QUEUE_CAPACITY);
    let (cmd_tx, cmd_rx) = unbounded();

    // Spawn stdin reader
    let inbound_tx = link.inbound_tx.clone();
    thread::spawn(move || read_stdin(inbound_tx, cmd_tx));

    // Spawn outbound writer
    let outbound_rx = link.outbound_rx.clone();
    let writer = thread::spawn(move || {
        let stdout = io::stdout();
        for text in outbound_rx.iter() {
            let mut out = stdout.lock();
            if writeln!(out, "{}", text).and_then(|_| out.flush()).is_err() {
                break;
            }
        }
    });
    drop(link);

    let mut app = App::new(session, adapter);
    app.run(&cmd_rx);

    // Closing the adapter ends the writer
    drop(app);
    let _ = writer.join();
    Ok(())
}

fn read_stdin(inbound_tx: Sender<String>, cmd_tx: Sender<Command>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('{') {
            if inbound_tx.send(line).is_err() {
                break;
            }
            continue;
        }
        match Command::parse(trimmed) {
            Some(cmd) => {
                if cmd_tx.send(cmd).is_err() {
                    break;
                }
            }
            None => tracing::warn!(line = trimmed, "unknown command, try `help`"),
        }
    }
    let _ = cmd_tx.send(Command::Quit);
}

/// Logs a one-line summary per rendered frame
#[derive(Default)]
struct LogSink;

impl RenderSink for LogSink {
    fn render(&mut self, frame: &RenderFrame) {
        let source = match frame.source {
            FrameSource::Live => "live".to_string(),
            FrameSource::Playback { time, role } => format!("{} @ {:.2}s", role, time),
        };
        let [original, processed] =
            [StreamRole::Original, StreamRole::Processed].map(|role| summarize(frame.channel(role)));
        tracing::info!("[{}] original: {} | processed: {}", source, original, processed);
    }
}

fn summarize(channel: &ChannelFrame) -> String {
    let peak = channel
        .peak_frequency
        .map_or_else(|| "-".to_string(), |hz| format!("{:.1} Hz", hz));
    let note = channel.chroma.dominant_name().unwrap_or("-");
    format!("peak {} chroma {}", peak, note)
}

struct App {
    session: Session,
    adapter: TransportAdapter,
    sink: LogSink,
    /// Original and processed players, once a track is loaded
    players: Option<(ClockPlayer, ClockPlayer)>,
    ticket: Option<FrameTicket>,
    next_frame: Instant,
}

impl App {
    fn new(session: Session, adapter: TransportAdapter) -> Self {
        Self {
            session,
            adapter,
            sink: LogSink,
            players: None,
            ticket: None,
            next_frame: Instant::now(),
        }
    }

    fn run(&mut self, cmd_rx: &Receiver<Command>) {
        let inbound = self.adapter.inbound().clone();
        loop {
            // Only wake for frames while the playback loop is armed
            let frame_timer = match self.ticket {
                Some(_) => after(self.next_frame.saturating_duration_since(Instant::now())),
                None => never(),
            };

            select! {
                recv(cmd_rx) -> cmd => match cmd {
                    Ok(Command::Quit) | Err(_) => return,
                    Ok(cmd) => self.on_command(cmd),
                },
                // Each engine message is handled as soon as it arrives
                recv(inbound) -> text => match text {
                    Ok(text) => {
                        if let HandleOutcome::TrackLoaded(track) =
                            self.session.handle_text(&text, &mut self.sink)
                        {
                            self.on_track_loaded(track.duration_secs());
                        }
                    }
                    Err(_) => {
                        tracing::info!("transport closed");
                        return;
                    }
                },
                recv(frame_timer) -> _ => {}
            }

            self.check_ended();
            if self.ticket.is_some() && Instant::now() >= self.next_frame {
                self.tick();
            }
        }
    }

    fn on_track_loaded(&mut self, duration: f64) {
        self.players = Some((ClockPlayer::new(duration), ClockPlayer::new(duration)));
        self.ticket = None;
    }

    fn on_command(&mut self, cmd: Command) {
        match cmd {
            Command::Play(role) => self.play(role),
            Command::Pause => self.pause_all(),
            Command::Stop => {
                self.pause_all();
                if let Some((original, processed)) = self.players.as_mut() {
                    original.stop();
                    processed.stop();
                }
            }
            Command::Seek(secs) => self.seek(secs),
            Command::Engine(command) => {
                if let Err(e) = self.adapter.send(&command) {
                    tracing::warn!(error = %e, "engine command not sent");
                }
            }
            Command::Status => self.log_status(),
            Command::Help => eprintln!("{}", HELP),
            Command::Quit => {}
        }
    }

    /// Players are mutually exclusive: starting one pauses the other
    fn play(&mut self, role: StreamRole) {
        if self.players.is_none() {
            tracing::warn!("no processed file loaded yet");
            return;
        }
        let other = role.other();
        if self.player_mut(other).is_some_and(|p| p.is_playing()) {
            if let Some(p) = self.player_mut(other) {
                p.pause();
            }
            self.emit(PlaybackEvent::Pause(other));
        }
        if let Some(p) = self.player_mut(role) {
            p.play();
        }
        self.emit(PlaybackEvent::Play(role));
    }

    fn pause_all(&mut self) {
        for role in [StreamRole::Original, StreamRole::Processed] {
            if self.player_mut(role).is_some_and(|p| p.is_playing()) {
                if let Some(p) = self.player_mut(role) {
                    p.pause();
                }
                self.emit(PlaybackEvent::Pause(role));
            }
        }
    }

    /// Both players jump so the two streams stay comparable
    fn seek(&mut self, secs: f64) {
        let Some((original, processed)) = self.players.as_mut() else {
            tracing::warn!("no processed file loaded yet");
            return;
        };
        original.seek(secs);
        processed.seek(secs);
        let role = PlayerPair::new(&*original, &*processed).authoritative();
        self.emit(PlaybackEvent::Seeked(role));
    }

    /// Turn a player reaching the end into an `Ended` event
    fn check_ended(&mut self) {
        let now = Instant::now();
        for role in [StreamRole::Original, StreamRole::Processed] {
            if self.player_mut(role).is_some_and(|p| p.ended_at(now)) {
                if let Some(p) = self.player_mut(role) {
                    p.pause_at(now);
                }
                self.emit(PlaybackEvent::Ended(role));
            }
        }
    }

    fn tick(&mut self) {
        let (Some(ticket), Some((original, processed))) = (self.ticket, self.players.as_ref()) else {
            return;
        };
        let players = PlayerPair::new(original, processed);
        self.ticket = self.session.frame_tick(ticket, &players, &mut self.sink);
        self.next_frame += self.session.scheduler().frame_interval();
        // Do not try to catch up after a stall
        let now = Instant::now();
        if self.next_frame < now {
            self.next_frame = now;
        }
    }

    fn emit(&mut self, event: PlaybackEvent) {
        let Some((original, processed)) = self.players.as_ref() else {
            return;
        };
        let players = PlayerPair::new(original, processed);
        match self.session.playback_event(event, &players, &mut self.sink) {
            ScheduleAction::Arm(ticket) => {
                self.ticket = Some(ticket);
                self.next_frame = Instant::now();
            }
            ScheduleAction::Stop => self.ticket = None,
            ScheduleAction::Redraw(_) | ScheduleAction::None => {}
        }
    }

    fn player_mut(&mut self, role: StreamRole) -> Option<&mut ClockPlayer> {
        let (original, processed) = self.players.as_mut()?;
        Some(match role {
            StreamRole::Original => original,
            StreamRole::Processed => processed,
        })
    }

    fn log_status(&self) {
        let stats = self.session.stats();
        let since_render = self
            .session
            .last_render_at()
            .map(|t| format!("{:.1}s ago", t.elapsed().as_secs_f64()))
            .unwrap_or_else(|| "never".to_string());

        if let Some((original, processed)) = self.players.as_ref() {
            tracing::info!(
                original = %format!("{:?} {:.2}/{:.2}s", original.state(), original.current_time(), original.duration()),
                processed = %format!("{:?} {:.2}/{:.2}s", processed.state(), processed.current_time(), processed.duration()),
                "players"
            );
        }
        tracing::info!(
            rendered = stats.rendered_frames,
            skipped = stats.skipped_frames,
            dropped_chunks = stats.dropped_chunks,
            dropped_messages = stats.dropped_messages,
            tracks = stats.tracks_loaded,
            last_render = %since_render,
            playing = self.session.scheduler().is_playing(),
            "session"
        );
    }
}
