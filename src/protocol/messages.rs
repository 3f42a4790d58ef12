use serde::{Deserialize, Serialize};

use super::types::{NightAction, ParticipantId};

/// Outbound wire messages. Only the gatekeeper and the connection layer
/// build these; UI code submits intents instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ClientMessage {
    ReadyToggle {
        ready: bool,
    },
    StartGame,
    NightTarget {
        target: ParticipantId,
        action: NightAction,
    },
    Vote {
        target: Option<ParticipantId>, // None => abstain
    },
    Chat {
        text: String,
    },
    KickRequest {
        target: ParticipantId,
    },
    ResyncRequest,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::ReadyToggle { .. } => "ready-toggle",
            ClientMessage::StartGame => "start-game",
            ClientMessage::NightTarget { .. } => "night-target",
            ClientMessage::Vote { .. } => "vote",
            ClientMessage::Chat { .. } => "chat",
            ClientMessage::KickRequest { .. } => "kick-request",
            ClientMessage::ResyncRequest => "resync-request",
        }
    }
}
