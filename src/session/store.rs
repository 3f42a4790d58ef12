use tracing::{debug, info, warn};

use super::feed::SnapshotFeed;
use super::state::{ChatEntry, Investigation, Participant, PendingAction, SessionState};
use crate::engine::phases::{classify_step, PhaseStep};
use crate::engine::IntentKind;
use crate::protocol::{
    Alignment, ChatAppended, ConnectionAck, FullState, GameEnded, InvestigationResult,
    ParticipantEliminated, ParticipantId, ParticipantView, PhaseChanged, Role, Round,
    ServerEvent, SessionPhase, Winner,
};

const LOG_TARGET: &str = "session::store";

/// What applying one event did to the state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateDelta {
    /// Repeated delivery of something already applied.
    Unchanged,
    /// Event dropped without touching state.
    Ignored { reason: &'static str },
    RosterReplaced { participants: usize },
    RoleAssigned(Role),
    /// A second, different role within one game. State untouched.
    RoleConflict { held: Role, received: Role },
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
        round: Round,
        skipped: bool, // not a legal edge from `from`
    },
    NewGame,
    ParticipantEliminated {
        id: ParticipantId,
        revealed_role: Option<Role>,
    },
    /// Elimination for an id the roster does not contain.
    UnknownParticipant(ParticipantId),
    GameEnded(Winner),
    ChatAppended { sequence: u64 },
    Investigated {
        id: ParticipantId,
        alignment: Alignment,
    },
    Kicked { reason: String },
    HostStatus(bool),
    Acknowledged,
    Resynchronized,
}

impl StateDelta {
    /// The event was applied (or dropped) but local state evidently diverged
    /// from the controller's.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            StateDelta::RoleConflict { .. }
                | StateDelta::UnknownParticipant(_)
                | StateDelta::PhaseChanged { skipped: true, .. }
        )
    }
}

pub struct SessionStore {
    state: SessionState,
    feed: SnapshotFeed,
    last_chat_sequence: Option<u64>,
    /// Set once a phase has been taken from the controller. Until then any
    /// phase is adopted as-is, so a replay after a resync is not a skip.
    phase_anchored: bool,
    /// Display name to find ourselves by when `self_id` is only provisional.
    unresolved_name: Option<String>,
}

impl SessionStore {
    /// Fresh store. Publishes its empty state immediately so subscribers
    /// never keep showing a discarded store.
    pub fn new(self_id: ParticipantId, feed: SnapshotFeed) -> Self {
        let mut state = SessionState::new(self_id);
        state.version = feed.current().version + 1;
        feed.publish(state.clone());
        Self {
            state,
            feed,
            last_chat_sequence: None,
            phase_anchored: false,
            unresolved_name: None,
        }
    }

    /// Fresh store whose `self_id` is a placeholder until a roster row with
    /// `display_name` shows up.
    pub fn provisional(display_name: impl Into<String>, feed: SnapshotFeed) -> Self {
        let display_name = display_name.into();
        let mut store = Self::new(ParticipantId::new(display_name.clone()), feed);
        store.unresolved_name = Some(display_name);
        store
    }

    pub fn unresolved_name(&self) -> Option<&str> {
        self.unresolved_name.as_deref()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn feed(&self) -> &SnapshotFeed {
        &self.feed
    }

    pub fn apply(&mut self, event: ServerEvent) -> StateDelta {
        let kind = event.kind();
        let delta = match event {
            ServerEvent::RosterSnapshot(snapshot) => self.replace_roster(snapshot.participants),
            ServerEvent::RoleAssigned(assigned) => self.assign_role(assigned.role),
            ServerEvent::PhaseChanged(changed) => self.change_phase(changed),
            ServerEvent::ParticipantEliminated(eliminated) => self.eliminate(eliminated),
            ServerEvent::GameEnded(ended) => self.end_game(ended),
            ServerEvent::ChatAppended(chat) => self.append_chat(chat),
            ServerEvent::InvestigationResult(result) => self.record_investigation(result),
            ServerEvent::Kicked(kicked) => {
                self.state.kicked = Some(kicked.reason.clone());
                self.state.pending = None;
                StateDelta::Kicked {
                    reason: kicked.reason,
                }
            }
            ServerEvent::HostStatus(status) => {
                let cleared = self.clear_pending_if(&[IntentKind::StartGame, IntentKind::Kick]);
                if self.state.is_host == status.is_host && !cleared {
                    StateDelta::Unchanged
                } else {
                    self.state.is_host = status.is_host;
                    StateDelta::HostStatus(status.is_host)
                }
            }
            ServerEvent::ConnectionAck(ack) => self.acknowledge(ack),
            ServerEvent::SessionSnapshot(full) => self.replace_all(full),
        };

        match &delta {
            StateDelta::Unchanged => {
                debug!(target = LOG_TARGET, event = kind, "duplicate event, state unchanged");
            }
            StateDelta::Ignored { reason } => {
                debug!(target = LOG_TARGET, event = kind, reason, "event ignored");
            }
            StateDelta::RoleConflict { .. } | StateDelta::UnknownParticipant(_) => {
                warn!(target = LOG_TARGET, event = kind, ?delta, "event conflicts with local state");
            }
            _ => self.commit(kind),
        }

        delta
    }

    pub(crate) fn mark_pending(&mut self, pending: PendingAction) {
        debug!(target = LOG_TARGET, kind = ?pending.kind, "pending action marked");
        self.state.pending = Some(pending);
        self.commit("pending");
    }

    pub(crate) fn clear_pending(&mut self) {
        if self.state.pending.take().is_some() {
            self.commit("pending-cleared");
        }
    }

    fn commit(&mut self, cause: &'static str) {
        self.state.version += 1;
        debug!(
            target = LOG_TARGET,
            cause,
            version = self.state.version,
            phase = ?self.state.phase,
            "publishing snapshot"
        );
        self.feed.publish(self.state.clone());
    }

    /// Drop the pending overlay if it is one of `kinds`. Returns whether it was.
    fn clear_pending_if(&mut self, kinds: &[IntentKind]) -> bool {
        let matched = self
            .state
            .pending
            .as_ref()
            .is_some_and(|pending| kinds.contains(&pending.kind));
        if matched {
            self.state.pending = None;
        }
        matched
    }

    /// Roles of living participants stay hidden until the game ends. For
    /// the investigator, a role shown on a living participant is the result
    /// of their own check and is kept as an alignment only.
    fn sanitize_roster(
        &self,
        views: Vec<ParticipantView>,
        phase: SessionPhase,
        self_role: Option<Role>,
    ) -> (Vec<Participant>, Vec<Investigation>) {
        let mut checked = Vec::new();
        let roster = views
            .into_iter()
            .map(|view| {
                let mut participant = Participant::from_view(view);
                let hidden = participant.alive && !phase.is_terminal();
                if !hidden {
                    return participant;
                }
                if let Some(role) = participant.revealed_role.take() {
                    if self_role == Some(Role::Investigator) && participant.id != self.state.self_id {
                        checked.push(Investigation {
                            participant_id: participant.id.clone(),
                            alignment: Alignment::from(role),
                        });
                    } else {
                        warn!(
                            target = LOG_TARGET,
                            participant = %participant.id,
                            "dropping revealed role of a living participant"
                        );
                    }
                }
                participant
            })
            .collect();
        (roster, checked)
    }

    fn install_roster(&mut self, roster: Vec<Participant>, checked: Vec<Investigation>) {
        self.state.roster = roster;
        for investigation in checked {
            self.upsert_investigation(investigation);
        }
        self.resolve_self();
    }

    fn replace_roster(&mut self, views: Vec<ParticipantView>) -> StateDelta {
        let (roster, checked) = self.sanitize_roster(views, self.state.phase, self.state.self_role);
        let participants = roster.len();
        self.install_roster(roster, checked);
        // An accepted start arrives as a phase change, so a roster means it was declined.
        self.clear_pending_if(&[IntentKind::ReadyToggle, IntentKind::Kick, IntentKind::StartGame]);
        StateDelta::RosterReplaced { participants }
    }

    /// Adopt the id of the roster row carrying our display name while our own
    /// id is still a placeholder.
    fn resolve_self(&mut self) {
        let Some(name) = self.unresolved_name.as_deref() else {
            return;
        };
        if self.state.participant(&self.state.self_id).is_some() {
            self.unresolved_name = None;
            return;
        }
        let mut named = self.state.roster.iter().filter(|p| p.name == name);
        match (named.next(), named.next()) {
            (Some(p), None) => {
                info!(
                    target = LOG_TARGET,
                    participant = %p.id,
                    name,
                    "resolved own participant id from roster"
                );
                self.state.self_id = p.id.clone();
                self.unresolved_name = None;
            }
            (Some(_), Some(_)) => {
                warn!(target = LOG_TARGET, name, "display name is ambiguous in roster");
            }
            (None, _) => {}
        }
    }

    fn upsert_investigation(&mut self, investigation: Investigation) -> bool {
        match self
            .state
            .investigations
            .iter_mut()
            .find(|i| i.participant_id == investigation.participant_id)
        {
            Some(existing) if existing.alignment == investigation.alignment => false,
            Some(existing) => {
                existing.alignment = investigation.alignment;
                true
            }
            None => {
                self.state.investigations.push(investigation);
                true
            }
        }
    }

    fn record_investigation(&mut self, result: InvestigationResult) -> StateDelta {
        if self.state.self_role != Some(Role::Investigator) {
            return StateDelta::Ignored {
                reason: "investigation result without investigator role",
            };
        }
        let InvestigationResult {
            participant_id,
            alignment,
        } = result;
        if self.state.participant(&participant_id).is_none() {
            return StateDelta::UnknownParticipant(participant_id);
        }
        let changed = self.upsert_investigation(Investigation {
            participant_id: participant_id.clone(),
            alignment,
        });
        if !changed {
            return StateDelta::Unchanged;
        }
        info!(target = LOG_TARGET, participant = %participant_id, ?alignment, "investigation result");
        StateDelta::Investigated {
            id: participant_id,
            alignment,
        }
    }

    fn assign_role(&mut self, role: Role) -> StateDelta {
        if self.state.phase.is_terminal() {
            return StateDelta::Ignored {
                reason: "role assigned after game end",
            };
        }
        match self.state.self_role {
            None => {
                info!(target = LOG_TARGET, ?role, "role assigned");
                self.state.self_role = Some(role);
                StateDelta::RoleAssigned(role)
            }
            Some(held) if held == role => StateDelta::Unchanged,
            Some(held) => StateDelta::RoleConflict {
                held,
                received: role,
            },
        }
    }

    fn change_phase(&mut self, changed: PhaseChanged) -> StateDelta {
        let PhaseChanged {
            phase,
            round,
            context,
        } = changed;
        let from = self.state.phase;

        let skipped = match classify_step(from, self.state.round, phase, round) {
            PhaseStep::Duplicate => return StateDelta::Unchanged,
            PhaseStep::Stale => {
                return StateDelta::Ignored {
                    reason: "round older than current",
                }
            }
            PhaseStep::AfterEnd if phase == SessionPhase::Lobby => {
                info!(target = LOG_TARGET, "new game after end, resetting state");
                self.reset_for_new_game();
                self.state.round = round;
                self.phase_anchored = true;
                return StateDelta::NewGame;
            }
            PhaseStep::AfterEnd => {
                return StateDelta::Ignored {
                    reason: "game already ended",
                }
            }
            PhaseStep::Advance => false,
            PhaseStep::Skipped if !self.phase_anchored => {
                info!(target = LOG_TARGET, ?from, to = ?phase, round, "adopting controller phase");
                false
            }
            PhaseStep::Skipped => {
                warn!(
                    target = LOG_TARGET,
                    ?from,
                    to = ?phase,
                    round,
                    "phase change skips a step"
                );
                true
            }
        };

        info!(target = LOG_TARGET, ?from, to = ?phase, round, "phase changed");
        self.state.phase = phase;
        self.state.round = round;
        self.state.last_eliminated = context.eliminated;
        self.state.phase_note = context.note;
        self.state.pending = None;
        self.phase_anchored = true;

        StateDelta::PhaseChanged {
            from,
            to: phase,
            round,
            skipped,
        }
    }

    fn reset_for_new_game(&mut self) {
        let mut fresh = SessionState::new(self.state.self_id.clone());
        fresh.version = self.state.version;
        fresh.acknowledged = self.state.acknowledged;
        fresh.is_host = self.state.is_host;
        fresh.roster = std::mem::take(&mut self.state.roster)
            .into_iter()
            .map(|p| Participant {
                alive: true,
                ready: false,
                revealed_role: None,
                ..p
            })
            .collect();
        self.state = fresh;
        self.last_chat_sequence = None;
    }

    fn eliminate(&mut self, eliminated: ParticipantEliminated) -> StateDelta {
        let ParticipantEliminated {
            participant_id,
            revealed_role,
        } = eliminated;

        let Some(participant) = self.state.participant_mut(&participant_id) else {
            return StateDelta::UnknownParticipant(participant_id);
        };
        if !participant.alive && (revealed_role.is_none() || participant.revealed_role == revealed_role)
        {
            return StateDelta::Unchanged;
        }
        participant.alive = false;
        if revealed_role.is_some() {
            participant.revealed_role = revealed_role;
        }

        let pending_on_target = self
            .state
            .pending
            .as_ref()
            .is_some_and(|pending| pending.target.as_ref() == Some(&participant_id));
        if participant_id == self.state.self_id || pending_on_target {
            self.state.pending = None;
        }

        info!(target = LOG_TARGET, participant = %participant_id, ?revealed_role, "participant eliminated");
        StateDelta::ParticipantEliminated {
            id: participant_id,
            revealed_role,
        }
    }

    fn end_game(&mut self, ended: GameEnded) -> StateDelta {
        if self.state.phase.is_terminal() && self.state.winner == Some(ended.winner) {
            return StateDelta::Unchanged;
        }
        self.state.phase = SessionPhase::Ended;
        self.state.winner = Some(ended.winner);
        self.state.pending = None;
        for reveal in ended.roles {
            match self.state.participant_mut(&reveal.participant_id) {
                Some(participant) => participant.revealed_role = Some(reveal.role),
                None => debug!(
                    target = LOG_TARGET,
                    participant = %reveal.participant_id,
                    "role reveal for participant not in roster"
                ),
            }
        }
        info!(target = LOG_TARGET, winner = ?ended.winner, "game ended");
        StateDelta::GameEnded(ended.winner)
    }

    fn append_chat(&mut self, chat: ChatAppended) -> StateDelta {
        let sequence = match (chat.sequence, self.last_chat_sequence) {
            (Some(seq), Some(last)) if seq <= last => return StateDelta::Unchanged,
            (Some(seq), _) => seq,
            (None, Some(last)) => last + 1,
            (None, None) => 0,
        };
        self.last_chat_sequence = Some(sequence);

        if chat.sender == self.state.self_id {
            self.clear_pending_if(&[IntentKind::Chat]);
        }
        self.state.chat.push(ChatEntry {
            sequence,
            sender: chat.sender,
            text: chat.text,
            sent_at: chat.sent_at,
        });
        StateDelta::ChatAppended { sequence }
    }

    fn acknowledge(&mut self, ack: ConnectionAck) -> StateDelta {
        if let Some(id) = ack.participant_id {
            self.unresolved_name = None;
            if id != self.state.self_id {
                warn!(
                    target = LOG_TARGET,
                    local = %self.state.self_id,
                    assigned = %id,
                    "controller assigned a different participant id, adopting it"
                );
                self.state.self_id = id;
            }
        } else if self.state.acknowledged {
            return StateDelta::Unchanged;
        }
        self.state.acknowledged = true;
        StateDelta::Acknowledged
    }

    fn replace_all(&mut self, full: FullState) -> StateDelta {
        let FullState {
            phase,
            round,
            participants,
            self_role,
            is_host,
            winner,
            investigations,
            chat,
        } = full;
        let (roster, checked) = self.sanitize_roster(participants, phase, self_role);
        self.state.investigations.clear();
        self.install_roster(roster, checked);
        if self_role == Some(Role::Investigator) {
            for result in investigations {
                if self.state.participant(&result.participant_id).is_some() {
                    self.upsert_investigation(Investigation {
                        participant_id: result.participant_id,
                        alignment: result.alignment,
                    });
                }
            }
        }
        self.state.chat.clear();
        self.last_chat_sequence = None;
        for entry in chat {
            self.append_chat(entry);
        }
        self.state.phase = phase;
        self.phase_anchored = true;
        self.state.round = round;
        self.state.self_role = self_role;
        if let Some(is_host) = is_host {
            self.state.is_host = is_host;
        }
        self.state.winner = winner;
        self.state.pending = None;
        info!(target = LOG_TARGET, ?phase, round, "state resynchronized from full snapshot");
        StateDelta::Resynchronized
    }
}
