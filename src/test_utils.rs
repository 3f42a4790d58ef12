//! Shared fixtures for session and client tests

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }
}

/// Builders for controller events, in both typed and wire form.
pub mod events {
    use crate::protocol::*;

    pub fn pid(id: &str) -> ParticipantId {
        ParticipantId::from(id)
    }

    pub fn view(id: &str, name: &str) -> ParticipantView {
        ParticipantView {
            id: pid(id),
            name: name.to_string(),
            alive: true,
            ready: false,
            revealed_role: None,
        }
    }

    pub fn roster(views: Vec<ParticipantView>) -> ServerEvent {
        ServerEvent::RosterSnapshot(RosterSnapshot {
            participants: views,
        })
    }

    /// Roster of living, unready participants named after their ids.
    pub fn roster_of(ids: &[&str]) -> ServerEvent {
        roster(ids.iter().map(|id| view(id, &id.to_uppercase())).collect())
    }

    pub fn phase(phase: SessionPhase, round: Round) -> ServerEvent {
        ServerEvent::PhaseChanged(PhaseChanged {
            phase,
            round,
            context: PhaseContext::default(),
        })
    }

    pub fn role(role: Role) -> ServerEvent {
        ServerEvent::RoleAssigned(RoleAssigned { role })
    }

    pub fn eliminated(id: &str, revealed_role: Option<Role>) -> ServerEvent {
        ServerEvent::ParticipantEliminated(ParticipantEliminated {
            participant_id: pid(id),
            revealed_role,
        })
    }

    pub fn chat(sender: &str, text: &str, sequence: Option<u64>) -> ServerEvent {
        ServerEvent::ChatAppended(ChatAppended {
            sender: pid(sender),
            text: text.to_string(),
            sequence,
            sent_at: None,
        })
    }

    pub fn investigated(id: &str, alignment: Alignment) -> ServerEvent {
        ServerEvent::InvestigationResult(InvestigationResult {
            participant_id: pid(id),
            alignment,
        })
    }

    pub fn host(is_host: bool) -> ServerEvent {
        ServerEvent::HostStatus(HostStatus { is_host })
    }

    pub fn wire(event: &ServerEvent) -> String {
        serde_json::to_string(event).expect("server events always serialize")
    }
}

/// Sessions prepared in a given phase with a given self role.
pub mod sessions {
    use super::events::*;
    use crate::protocol::{Role, SessionPhase};
    use crate::session::SessionCore;

    /// Self is `a`; roster is `a`, `b`, `c`, `d`.
    pub fn core_at(phase_to: SessionPhase, self_role: Option<Role>) -> SessionCore {
        let mut core = SessionCore::new(pid("a"));
        feed(&mut core, &roster_of(&["a", "b", "c", "d"]));
        if phase_to == SessionPhase::Lobby {
            return core;
        }
        feed(&mut core, &phase(SessionPhase::RoleAssignment, 0));
        if let Some(role_held) = self_role {
            feed(&mut core, &role(role_held));
        }
        let path = [
            (SessionPhase::Night, 1),
            (SessionPhase::DayDiscussion, 1),
            (SessionPhase::DayVote, 1),
            (SessionPhase::Resolution, 1),
        ];
        for (next, round) in path {
            if core.snapshot().phase == phase_to {
                break;
            }
            feed(&mut core, &phase(next, round));
        }
        assert_eq!(core.snapshot().phase, phase_to, "fixture failed to reach phase");
        core
    }

    pub fn feed(core: &mut SessionCore, event: &crate::protocol::ServerEvent) {
        let outcome = core.receive(&wire(event));
        assert!(
            matches!(outcome, crate::session::InboundOutcome::Applied(_)),
            "fixture event {event:?} not applied: {outcome:?}"
        );
    }
}
