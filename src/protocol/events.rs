use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Alignment, ParticipantId, Role, Round, SessionPhase, Winner};

fn alive_by_default() -> bool {
    true
}

/// One roster row as the controller reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub name: String,
    #[serde(default = "alive_by_default")]
    pub alive: bool,
    #[serde(default)]
    pub ready: bool, // lobby only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_role: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub participants: Vec<ParticipantView>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssigned {
    pub role: Role,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseContext {
    #[serde(default, alias = "killed", skip_serializing_if = "Option::is_none")]
    pub eliminated: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChanged {
    pub phase: SessionPhase,
    pub round: Round,
    #[serde(default)]
    pub context: PhaseContext,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantEliminated {
    pub participant_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revealed_role: Option<Role>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleReveal {
    pub participant_id: ParticipantId,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEnded {
    pub winner: Winner,
    #[serde(default)]
    pub roles: Vec<RoleReveal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAppended {
    pub sender: ParticipantId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

/// Result of the local investigator's night check. Sent only to them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationResult {
    pub participant_id: ParticipantId,
    pub alignment: Alignment,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kicked {
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStatus {
    #[serde(alias = "isHost")]
    pub is_host: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<ParticipantId>,
}

/// Full-state reply to a resync request. Replaces everything the store holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullState {
    pub phase: SessionPhase,
    pub round: Round,
    pub participants: Vec<ParticipantView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_host: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Winner>,
    /// Own investigation results; empty for everyone but the investigator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub investigations: Vec<InvestigationResult>,
    /// Chat history so far, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chat: Vec<ChatAppended>,
}

/// Every event the controller may push. Closed on purpose: tags outside this
/// set decode to `DecodeError::UnknownEvent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum ServerEvent {
    RosterSnapshot(RosterSnapshot),
    RoleAssigned(RoleAssigned),
    PhaseChanged(PhaseChanged),
    ParticipantEliminated(ParticipantEliminated),
    GameEnded(GameEnded),
    ChatAppended(ChatAppended),
    InvestigationResult(InvestigationResult),
    Kicked(Kicked),
    HostStatus(HostStatus),
    ConnectionAck(ConnectionAck),
    SessionSnapshot(FullState),
}

impl ServerEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::RosterSnapshot(_) => "roster-snapshot",
            ServerEvent::RoleAssigned(_) => "role-assigned",
            ServerEvent::PhaseChanged(_) => "phase-changed",
            ServerEvent::ParticipantEliminated(_) => "participant-eliminated",
            ServerEvent::GameEnded(_) => "game-ended",
            ServerEvent::ChatAppended(_) => "chat-appended",
            ServerEvent::InvestigationResult(_) => "investigation-result",
            ServerEvent::Kicked(_) => "kicked",
            ServerEvent::HostStatus(_) => "host-status",
            ServerEvent::ConnectionAck(_) => "connection-ack",
            ServerEvent::SessionSnapshot(_) => "session-snapshot",
        }
    }
}
