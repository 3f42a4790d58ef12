use serde::{Deserialize, Serialize};

use crate::protocol::ParticipantId;

/// What the user asked for. The gatekeeper turns an accepted intent into
/// exactly one outbound message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    ReadyToggle { ready: bool },
    StartGame,
    NightTarget { target: ParticipantId },
    Vote { target: Option<ParticipantId> }, // None => abstain
    Chat { text: String },
    Kick { target: ParticipantId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntentKind {
    ReadyToggle,
    StartGame,
    NightTarget,
    Vote,
    Chat,
    Kick,
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::ReadyToggle { .. } => IntentKind::ReadyToggle,
            Intent::StartGame => IntentKind::StartGame,
            Intent::NightTarget { .. } => IntentKind::NightTarget,
            Intent::Vote { .. } => IntentKind::Vote,
            Intent::Chat { .. } => IntentKind::Chat,
            Intent::Kick { .. } => IntentKind::Kick,
        }
    }

    pub fn target(&self) -> Option<&ParticipantId> {
        match self {
            Intent::NightTarget { target } | Intent::Kick { target } => Some(target),
            Intent::Vote { target } => target.as_ref(),
            _ => None,
        }
    }
}
