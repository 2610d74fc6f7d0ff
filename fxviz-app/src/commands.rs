//! Console commands for fxviz

use fxviz_engine::StreamRole;
use fxviz_transport::{EffectSlot, EngineCommand};

pub const HELP: &str = "\
commands:
  play [original|processed]   start playback (default: original)
  pause                       pause playback
  seek <secs>                 jump both players
  stop                        stop and rewind
  status                      log playback state and counters
  mic on|off                  start or stop the live stream
  chain <id>:<type> ...       rebuild the effect chain
  set <effect> <param> <val>  change an effect parameter
  process <data-uri>          run a file through the chain
  help                        show this text
  quit                        exit
lines starting with '{' are treated as engine messages";

/// Commands that can be dispatched from a console line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // Playback
    Play(StreamRole),
    Pause,
    Seek(f64),
    Stop,

    // Forwarded to the effect engine
    Engine(EngineCommand),

    // System
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse one console line. `None` for unknown or incomplete input.
    pub fn parse(line: &str) -> Option<Self> {
        let input = line.trim();

        // Handle simple commands first
        match input {
            "q" | "quit" | "exit" => return Some(Command::Quit),
            "help" | "?" => return Some(Command::Help),
            "status" => return Some(Command::Status),
            "pause" => return Some(Command::Pause),
            "stop" => return Some(Command::Stop),
            "play" => return Some(Command::Play(StreamRole::Original)),
            _ => {}
        }

        let (verb, rest) = input.split_once(char::is_whitespace)?;
        let rest = rest.trim();

        match verb {
            "play" => StreamRole::parse(rest).map(Command::Play),
            "seek" => rest
                .parse::<f64>()
                .ok()
                .filter(|secs| secs.is_finite())
                .map(Command::Seek),
            "mic" => match rest {
                "on" => Some(Command::Engine(EngineCommand::StartMic)),
                "off" => Some(Command::Engine(EngineCommand::Stop)),
                _ => None,
            },
            "chain" => parse_chain(rest).map(|config| Command::Engine(EngineCommand::BuildChain { config })),
            "set" => parse_set(rest).map(Command::Engine),
            "process" => Some(Command::Engine(EngineCommand::ProcessFile {
                contents: unquote(rest).to_string(),
            })),
            _ => None,
        }
    }
}

/// `delay1:delay rev:reverb` -> two slots with empty params
fn parse_chain(rest: &str) -> Option<Vec<EffectSlot>> {
    let mut slots = Vec::new();
    for token in rest.split_whitespace() {
        let (id, kind) = token.split_once(':')?;
        if id.is_empty() || kind.is_empty() {
            return None;
        }
        slots.push(EffectSlot::new(id, kind));
    }
    (!slots.is_empty()).then_some(slots)
}

/// `<effect> <param> <value>`; numeric values are sent as numbers
fn parse_set(rest: &str) -> Option<EngineCommand> {
    let mut parts = rest.splitn(3, char::is_whitespace);
    let effect_id = parts.next()?;
    let param = parts.next()?;
    let value = unquote(parts.next()?.trim());
    if value.is_empty() {
        return None;
    }

    Some(match value.parse::<f64>() {
        Ok(n) if n.is_finite() => EngineCommand::update_param(effect_id, param, n),
        _ => match value {
            "true" => EngineCommand::update_param(effect_id, param, true),
            "false" => EngineCommand::update_param(effect_id, param, false),
            _ => EngineCommand::update_param(effect_id, param, value),
        },
    })
}

/// Remove surrounding quotes if present
fn unquote(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
