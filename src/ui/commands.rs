//! Terminal command parsing.

use thiserror::Error;

use crate::engine::Intent;
use crate::protocol::ParticipantId;
use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Intent(Intent),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("type a command, or `help`")]
    Empty,
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs a participant")]
    MissingTarget(&'static str),
    #[error("no participant called `{0}`")]
    UnknownParticipant(String),
    #[error("`{0}` matches more than one participant")]
    AmbiguousParticipant(String),
}

pub const HELP: &str = "\
commands:
  ready | unready          toggle ready in the lobby
  start                    start the game (host)
  kick <name>              remove a participant (host)
  target <name>            night action
  vote <name> | abstain    day vote
  say <text>               chat during discussion
  help | quit";

/// Parse one input line. Participant names resolve against the roster by id
/// or case-insensitive display name.
pub fn parse(line: &str, state: &SessionState) -> Result<UserCommand, ParseError> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(word, rest)| (word, rest.trim()))
        .unwrap_or((line, ""));

    let intent = match word.to_ascii_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "help" | "?" => return Ok(UserCommand::Help),
        "quit" | "exit" | "leave" => return Ok(UserCommand::Quit),
        "ready" => Intent::ReadyToggle { ready: true },
        "unready" => Intent::ReadyToggle { ready: false },
        "start" => Intent::StartGame,
        "kick" => Intent::Kick {
            target: resolve("kick", rest, state)?,
        },
        "target" | "kill" | "check" => Intent::NightTarget {
            target: resolve("target", rest, state)?,
        },
        "vote" => Intent::Vote {
            target: Some(resolve("vote", rest, state)?),
        },
        "abstain" | "skip" => Intent::Vote { target: None },
        "say" | "chat" => Intent::Chat {
            text: rest.to_string(),
        },
        _ => return Err(ParseError::Unknown(word.to_string())),
    };
    Ok(UserCommand::Intent(intent))
}

fn resolve(
    command: &'static str,
    name: &str,
    state: &SessionState,
) -> Result<ParticipantId, ParseError> {
    if name.is_empty() {
        return Err(ParseError::MissingTarget(command));
    }
    if let Some(p) = state.roster.iter().find(|p| p.id.as_str() == name) {
        return Ok(p.id.clone());
    }

    let mut matches = state
        .roster
        .iter()
        .filter(|p| p.name.eq_ignore_ascii_case(name));
    match (matches.next(), matches.next()) {
        (Some(p), None) => Ok(p.id.clone()),
        (Some(_), Some(_)) => Err(ParseError::AmbiguousParticipant(name.to_string())),
        (None, _) => Err(ParseError::UnknownParticipant(name.to_string())),
    }
}
