use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{legal_actions, Intent, IntentKind, LegalActions};
use crate::protocol::{
    Alignment, ParticipantId, ParticipantView, Role, Round, SessionPhase, Winner,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub alive: bool,
    pub ready: bool,
    pub revealed_role: Option<Role>, // eliminated participants, or everyone once ended
}

impl Participant {
    pub(crate) fn from_view(view: ParticipantView) -> Self {
        Self {
            id: view.id,
            name: view.name,
            alive: view.alive,
            ready: view.ready,
            revealed_role: view.revealed_role,
        }
    }
}

/// Optimistic overlay for an intent the server has not reflected yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PendingAction {
    pub kind: IntentKind,
    pub target: Option<ParticipantId>,
    pub ready: Option<bool>,
    pub phase: SessionPhase,
    pub round: Round,
}

impl PendingAction {
    pub fn for_intent(intent: &Intent, phase: SessionPhase, round: Round) -> Self {
        let ready = match intent {
            Intent::ReadyToggle { ready } => Some(*ready),
            _ => None,
        };
        Self {
            kind: intent.kind(),
            target: intent.target().cloned(),
            ready,
            phase,
            round,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatEntry {
    pub sequence: u64,
    pub sender: ParticipantId,
    pub text: String,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Alignment the local investigator learned about a participant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Investigation {
    pub participant_id: ParticipantId,
    pub alignment: Alignment,
}

/// The single owned record of everything the client knows about the
/// session. Only `SessionStore::apply` and the gatekeeper's pending overlay
/// change it; everyone else sees immutable snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub version: u64,
    pub self_id: ParticipantId,
    pub acknowledged: bool,
    pub phase: SessionPhase,
    pub round: Round,
    pub roster: Vec<Participant>,
    pub self_role: Option<Role>,
    pub is_host: bool,
    pub chat: Vec<ChatEntry>,
    pub investigations: Vec<Investigation>, // only ever filled for the investigator
    pub pending: Option<PendingAction>,
    pub last_eliminated: Option<ParticipantId>,
    pub phase_note: Option<String>,
    pub winner: Option<Winner>,
    pub kicked: Option<String>,
}

impl SessionState {
    pub fn new(self_id: ParticipantId) -> Self {
        Self {
            version: 0,
            self_id,
            acknowledged: false,
            phase: SessionPhase::Lobby,
            round: 0,
            roster: Vec::new(),
            self_role: None,
            is_host: false,
            chat: Vec::new(),
            investigations: Vec::new(),
            pending: None,
            last_eliminated: None,
            phase_note: None,
            winner: None,
            kicked: None,
        }
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.roster.iter().find(|p| &p.id == id)
    }

    pub(crate) fn participant_mut(&mut self, id: &ParticipantId) -> Option<&mut Participant> {
        self.roster.iter_mut().find(|p| &p.id == id)
    }

    pub fn me(&self) -> Option<&Participant> {
        self.participant(&self.self_id)
    }

    pub fn is_alive(&self, id: &ParticipantId) -> bool {
        self.participant(id).is_some_and(|p| p.alive)
    }

    pub fn living(&self) -> impl Iterator<Item = &Participant> {
        self.roster.iter().filter(|p| p.alive)
    }

    /// Living participants other than self, i.e. the valid targets.
    pub fn targets(&self) -> impl Iterator<Item = &Participant> {
        self.living().filter(move |p| p.id != self.self_id)
    }

    pub fn display_name<'a>(&'a self, id: &'a ParticipantId) -> &'a str {
        self.participant(id)
            .map(|p| p.name.as_str())
            .unwrap_or(id.as_str())
    }

    pub fn investigation(&self, id: &ParticipantId) -> Option<Alignment> {
        self.investigations
            .iter()
            .find(|i| &i.participant_id == id)
            .map(|i| i.alignment)
    }

    pub fn legal_actions(&self) -> LegalActions {
        let alive = self.me().is_some_and(|p| p.alive);
        legal_actions(self.phase, self.self_role, alive, self.is_host)
    }
}
