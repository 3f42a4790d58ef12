#![cfg(test)]

use super::*;
use crate::engine::{Intent, IntentKind};
use crate::protocol::*;
use crate::test_utils::events::*;
use crate::test_utils::sessions::{core_at, feed};

fn store() -> SessionStore {
    SessionStore::new(pid("a"), SnapshotFeed::new(pid("a")))
}

fn ids(state: &SessionState) -> Vec<&str> {
    state.roster.iter().map(|p| p.id.as_str()).collect()
}

#[test]
fn roster_snapshots_replace_without_residue() {
    let mut store = store();
    store.apply(roster_of(&["a", "b", "c", "d"]));
    store.apply(roster(vec![
        view("a", "A"),
        ParticipantView {
            ready: true,
            ..view("e", "E")
        },
    ]));
    assert_eq!(ids(store.state()), vec!["a", "e"]);

    store.apply(roster_of(&["c"]));
    assert_eq!(ids(store.state()), vec!["c"]);
    assert!(!store.state().roster[0].ready);
}

#[test]
fn duplicate_phase_change_is_idempotent() {
    let mut store = store();
    store.apply(phase(SessionPhase::RoleAssignment, 0));
    assert!(matches!(
        store.apply(phase(SessionPhase::Night, 3)),
        StateDelta::PhaseChanged { round: 3, .. }
    ));
    let version = store.state().version;

    assert_eq!(store.apply(phase(SessionPhase::Night, 3)), StateDelta::Unchanged);
    assert_eq!(store.state().round, 3);
    assert_eq!(store.state().version, version);
}

#[test]
fn older_round_is_ignored() {
    let mut store = store();
    store.apply(phase(SessionPhase::RoleAssignment, 0));
    store.apply(phase(SessionPhase::Night, 2));
    store.apply(phase(SessionPhase::DayDiscussion, 2));

    let delta = store.apply(phase(SessionPhase::Night, 1));
    assert!(matches!(delta, StateDelta::Ignored { .. }));
    assert_eq!(store.state().phase, SessionPhase::DayDiscussion);
    assert_eq!(store.state().round, 2);
}

#[test]
fn skipped_phase_is_applied_but_flags_resync() {
    let mut store = store();
    store.apply(phase(SessionPhase::RoleAssignment, 0));
    let delta = store.apply(phase(SessionPhase::DayVote, 1));
    assert!(delta.requires_resync());
    assert_eq!(store.state().phase, SessionPhase::DayVote);
}

#[test]
fn fresh_store_adopts_any_first_phase() {
    let mut store = store();
    let delta = store.apply(phase(SessionPhase::DayVote, 2));
    assert_eq!(
        delta,
        StateDelta::PhaseChanged {
            from: SessionPhase::Lobby,
            to: SessionPhase::DayVote,
            round: 2,
            skipped: false,
        }
    );
    assert!(!delta.requires_resync());
}

#[test]
fn replay_after_resync_settles_without_another_resync() {
    let mut core = core_at(SessionPhase::Night, Some(Role::Investigator));
    core.resynchronize().unwrap();

    for event in [
        roster_of(&["a", "b", "c", "d"]),
        role(Role::Investigator),
        phase(SessionPhase::Night, 1),
    ] {
        let outcome = core.receive(&wire(&event));
        assert!(matches!(outcome, InboundOutcome::Applied(_)), "{event:?}: {outcome:?}");
    }
    let snapshot = core.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Night);
    assert_eq!(snapshot.roster.len(), 4);
    assert!(core.submit(&Intent::NightTarget { target: pid("b") }).is_ok());

    let outcome = core.receive(&wire(&phase(SessionPhase::DayVote, 1)));
    assert!(matches!(outcome, InboundOutcome::NeedsResync { .. }), "{outcome:?}");
}

#[test]
fn lobby_snapshot_shows_host_and_ready_flags() {
    let mut store = store();
    store.apply(roster_of(&["a", "b", "c"]));
    store.apply(roster(vec![
        view("a", "A"),
        ParticipantView {
            ready: true,
            ..view("b", "B")
        },
        view("c", "C"),
    ]));
    store.apply(roster(vec![
        view("a", "A"),
        ParticipantView {
            ready: true,
            ..view("b", "B")
        },
        ParticipantView {
            ready: true,
            ..view("c", "C")
        },
    ]));
    store.apply(host(true));

    let snapshot = store.feed().current();
    assert!(snapshot.is_host);
    let ready: Vec<&str> = snapshot
        .roster
        .iter()
        .filter(|p| p.ready)
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(ready, vec!["b", "c"]);
    assert!(!snapshot.me().unwrap().ready);
}

#[test]
fn elimination_during_resolution_reveals_role_and_blocks_targeting() {
    let mut core = core_at(SessionPhase::Resolution, Some(Role::FactionMember));
    feed(&mut core, &eliminated("c", Some(Role::FactionMember)));

    let snapshot = core.snapshot();
    let c = snapshot.participant(&pid("c")).unwrap();
    assert!(!c.alive);
    assert_eq!(c.revealed_role, Some(Role::FactionMember));

    feed(&mut core, &phase(SessionPhase::Night, 2));
    let err = core
        .submit(&Intent::NightTarget { target: pid("c") })
        .unwrap_err();
    assert!(matches!(
        err,
        SubmitError::Rejected(crate::engine::Rejection::InvalidTarget)
    ));
}

#[test]
fn repeated_elimination_is_a_no_op() {
    let mut store = store();
    store.apply(roster_of(&["a", "b"]));
    store.apply(eliminated("b", Some(Role::Bystander)));
    assert_eq!(
        store.apply(eliminated("b", Some(Role::Bystander))),
        StateDelta::Unchanged
    );
}

#[test]
fn elimination_of_unknown_participant_requires_resync() {
    let mut store = store();
    store.apply(roster_of(&["a", "b"]));
    let delta = store.apply(eliminated("zz", None));
    assert_eq!(delta, StateDelta::UnknownParticipant(pid("zz")));
    assert!(delta.requires_resync());
}

#[test]
fn living_participants_never_carry_revealed_roles() {
    let mut store = store();
    store.apply(roster(vec![
        view("a", "A"),
        ParticipantView {
            revealed_role: Some(Role::Investigator),
            ..view("b", "B")
        },
        ParticipantView {
            alive: false,
            revealed_role: Some(Role::Bystander),
            ..view("c", "C")
        },
    ]));
    let state = store.state();
    assert_eq!(state.participant(&pid("b")).unwrap().revealed_role, None);
    assert_eq!(
        state.participant(&pid("c")).unwrap().revealed_role,
        Some(Role::Bystander)
    );
}

#[test]
fn self_role_is_set_once_per_game() {
    let mut store = store();
    assert_eq!(
        store.apply(role(Role::Investigator)),
        StateDelta::RoleAssigned(Role::Investigator)
    );
    assert_eq!(store.apply(role(Role::Investigator)), StateDelta::Unchanged);

    let delta = store.apply(role(Role::LeaderFaction));
    assert!(delta.requires_resync());
    assert_eq!(store.state().self_role, Some(Role::Investigator));
}

#[test]
fn game_end_reveals_everyone_and_only_lobby_restarts() {
    let mut store = store();
    store.apply(roster_of(&["a", "b"]));
    store.apply(phase(SessionPhase::RoleAssignment, 0));
    store.apply(role(Role::Bystander));
    store.apply(phase(SessionPhase::Night, 1));

    let delta = store.apply(ServerEvent::GameEnded(GameEnded {
        winner: Winner::Faction,
        roles: vec![
            RoleReveal {
                participant_id: pid("a"),
                role: Role::Bystander,
            },
            RoleReveal {
                participant_id: pid("b"),
                role: Role::LeaderFaction,
            },
        ],
    }));
    assert_eq!(delta, StateDelta::GameEnded(Winner::Faction));
    assert_eq!(store.state().phase, SessionPhase::Ended);
    assert_eq!(
        store.state().participant(&pid("b")).unwrap().revealed_role,
        Some(Role::LeaderFaction)
    );

    assert!(matches!(
        store.apply(phase(SessionPhase::DayDiscussion, 5)),
        StateDelta::Ignored { .. }
    ));

    assert_eq!(store.apply(phase(SessionPhase::Lobby, 0)), StateDelta::NewGame);
    let state = store.state();
    assert_eq!(state.phase, SessionPhase::Lobby);
    assert_eq!(state.self_role, None);
    assert_eq!(state.winner, None);
    assert!(state.roster.iter().all(|p| p.alive && p.revealed_role.is_none()));
}

#[test]
fn chat_is_append_only_and_deduplicated_by_sequence() {
    let mut store = store();
    store.apply(chat("b", "hello", Some(4)));
    store.apply(chat("c", "hi", Some(5)));
    assert_eq!(store.apply(chat("b", "hello", Some(4))), StateDelta::Unchanged);
    assert_eq!(
        store.apply(chat("d", "no sequence", None)),
        StateDelta::ChatAppended { sequence: 6 }
    );

    let texts: Vec<&str> = store.state().chat.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "hi", "no sequence"]);
}

#[test]
fn full_snapshot_replaces_everything() {
    let mut store = store();
    store.apply(roster_of(&["a", "b", "c"]));
    store.apply(ServerEvent::SessionSnapshot(FullState {
        phase: SessionPhase::DayVote,
        round: 3,
        participants: vec![view("a", "A"), view("d", "D")],
        self_role: Some(Role::Investigator),
        is_host: Some(true),
        winner: None,
        investigations: Vec::new(),
        chat: Vec::new(),
    }));

    let state = store.state();
    assert_eq!(state.phase, SessionPhase::DayVote);
    assert_eq!(state.round, 3);
    assert_eq!(ids(state), vec!["a", "d"]);
    assert_eq!(state.self_role, Some(Role::Investigator));
    assert!(state.is_host);
}

fn chat_line(sender: &str, text: &str, sequence: Option<u64>) -> ChatAppended {
    ChatAppended {
        sender: pid(sender),
        text: text.to_string(),
        sequence,
        sent_at: None,
    }
}

#[test]
fn full_snapshot_restores_chat_history() {
    let mut store = store();
    store.apply(chat("b", "stale line", Some(40)));
    store.apply(ServerEvent::SessionSnapshot(FullState {
        phase: SessionPhase::DayDiscussion,
        round: 2,
        participants: vec![view("a", "A"), view("b", "B")],
        self_role: Some(Role::Bystander),
        is_host: None,
        winner: None,
        investigations: Vec::new(),
        chat: vec![chat_line("b", "morning", Some(3)), chat_line("a", "who?", None)],
    }));

    let history: Vec<(u64, &str)> = store
        .state()
        .chat
        .iter()
        .map(|c| (c.sequence, c.text.as_str()))
        .collect();
    assert_eq!(history, vec![(3, "morning"), (4, "who?")]);
    assert_eq!(
        store.apply(chat("b", "next", None)),
        StateDelta::ChatAppended { sequence: 5 }
    );
    assert_eq!(store.apply(chat("b", "morning", Some(3))), StateDelta::Unchanged);
}

#[test]
fn full_snapshot_restores_investigations_for_the_investigator_only() {
    let snapshot = |self_role| {
        ServerEvent::SessionSnapshot(FullState {
            phase: SessionPhase::DayDiscussion,
            round: 1,
            participants: vec![view("a", "A"), view("b", "B"), view("c", "C")],
            self_role: Some(self_role),
            is_host: None,
            winner: None,
            investigations: vec![
                InvestigationResult {
                    participant_id: pid("b"),
                    alignment: Alignment::Faction,
                },
                InvestigationResult {
                    participant_id: pid("gone"),
                    alignment: Alignment::Town,
                },
            ],
            chat: Vec::new(),
        })
    };

    let mut store = store();
    store.apply(snapshot(Role::Investigator));
    assert_eq!(store.state().investigation(&pid("b")), Some(Alignment::Faction));
    assert_eq!(store.state().investigations.len(), 1);

    let mut store = self::store();
    store.apply(snapshot(Role::Bystander));
    assert!(store.state().investigations.is_empty());
}

#[test]
fn investigation_results_reach_only_the_investigator() {
    let mut core = core_at(SessionPhase::Night, Some(Role::Investigator));
    core.submit(&Intent::NightTarget { target: pid("c") }).unwrap();

    let outcome = core.receive(&wire(&investigated("c", Alignment::Faction)));
    assert_eq!(
        outcome,
        InboundOutcome::Applied(StateDelta::Investigated {
            id: pid("c"),
            alignment: Alignment::Faction,
        })
    );
    assert_eq!(core.snapshot().investigation(&pid("c")), Some(Alignment::Faction));
    assert_eq!(
        core.receive(&wire(&investigated("c", Alignment::Faction))),
        InboundOutcome::Applied(StateDelta::Unchanged)
    );
    assert!(matches!(
        core.receive(&wire(&investigated("zz", Alignment::Town))),
        InboundOutcome::NeedsResync { .. }
    ));

    let mut bystander = core_at(SessionPhase::Night, Some(Role::Bystander));
    let before = bystander.snapshot();
    assert!(matches!(
        bystander.receive(&wire(&investigated("c", Alignment::Faction))),
        InboundOutcome::Applied(StateDelta::Ignored { .. })
    ));
    assert_eq!(bystander.snapshot(), before);
}

#[test]
fn investigator_keeps_only_the_alignment_of_a_checked_roster_row() {
    let mut core = core_at(SessionPhase::DayDiscussion, Some(Role::Investigator));
    feed(
        &mut core,
        &roster(vec![
            view("a", "A"),
            ParticipantView {
                revealed_role: Some(Role::LeaderFaction),
                ..view("b", "B")
            },
            view("c", "C"),
        ]),
    );
    let snapshot = core.snapshot();
    assert_eq!(snapshot.participant(&pid("b")).unwrap().revealed_role, None);
    assert_eq!(snapshot.investigation(&pid("b")), Some(Alignment::Faction));
    assert_eq!(snapshot.investigation(&pid("c")), None);
}

#[test]
fn new_game_forgets_investigations() {
    let mut core = core_at(SessionPhase::Night, Some(Role::Investigator));
    feed(&mut core, &investigated("b", Alignment::Town));
    feed(
        &mut core,
        &ServerEvent::GameEnded(GameEnded {
            winner: Winner::Town,
            roles: Vec::new(),
        }),
    );
    feed(&mut core, &phase(SessionPhase::Lobby, 0));
    assert!(core.snapshot().investigations.is_empty());
}

#[test]
fn connection_ack_adopts_assigned_identity() {
    let mut store = store();
    store.apply(ServerEvent::ConnectionAck(ConnectionAck {
        participant_id: Some(pid("server-a")),
    }));
    assert!(store.state().acknowledged);
    assert_eq!(store.state().self_id, pid("server-a"));
}

#[test]
fn display_name_resolves_to_the_roster_id() {
    let mut core = SessionCore::new(LocalIdentity::DisplayName("ann".to_string()));
    feed(
        &mut core,
        &roster(vec![view("p-7f3a", "bo"), view("p-91c2", "ann")]),
    );
    assert_eq!(core.snapshot().self_id, pid("p-91c2"));
    assert_eq!(core.snapshot().me().unwrap().name, "ann");
    assert!(core.store().unresolved_name().is_none());
    assert!(core.submit(&Intent::ReadyToggle { ready: true }).is_ok());

    core.resynchronize().unwrap();
    assert_eq!(core.snapshot().self_id, pid("p-91c2"));
}

#[test]
fn ambiguous_display_name_stays_unresolved() {
    let mut core = SessionCore::new(LocalIdentity::DisplayName("ann".to_string()));
    feed(
        &mut core,
        &roster(vec![view("p-1", "ann"), view("p-2", "ann")]),
    );
    assert_eq!(core.store().unresolved_name(), Some("ann"));
    assert!(core.snapshot().me().is_none());
    assert!(core.submit(&Intent::ReadyToggle { ready: true }).is_err());

    core.resynchronize().unwrap();
    assert_eq!(core.store().unresolved_name(), Some("ann"));
    feed(&mut core, &roster(vec![view("p-2", "ann"), view("p-3", "cy")]));
    assert_eq!(core.snapshot().self_id, pid("p-2"));
}

#[test]
fn kicked_is_recorded() {
    let mut store = store();
    let delta = store.apply(ServerEvent::Kicked(Kicked {
        reason: "host removed you".into(),
    }));
    assert_eq!(
        delta,
        StateDelta::Kicked {
            reason: "host removed you".into()
        }
    );
    assert_eq!(store.state().kicked.as_deref(), Some("host removed you"));
}

#[test]
fn pending_ready_cleared_by_next_roster() {
    let mut core = core_at(SessionPhase::Lobby, None);
    core.submit(&Intent::ReadyToggle { ready: true }).unwrap();
    assert_eq!(
        core.snapshot().pending.as_ref().map(|p| p.kind),
        Some(IntentKind::ReadyToggle)
    );

    feed(
        &mut core,
        &roster(vec![
            ParticipantView {
                ready: true,
                ..view("a", "A")
            },
            view("b", "B"),
        ]),
    );
    assert!(core.snapshot().pending.is_none());
    assert!(core.snapshot().me().unwrap().ready);
}

#[test]
fn declined_start_is_cleared_by_the_next_roster() {
    let mut core = core_at(SessionPhase::Lobby, None);
    feed(&mut core, &host(true));
    core.submit(&Intent::StartGame).unwrap();

    feed(&mut core, &roster_of(&["a", "b", "c", "d"]));
    assert!(core.snapshot().pending.is_none());
    assert!(core.submit(&Intent::ReadyToggle { ready: true }).is_ok());
}

#[test]
fn host_status_clears_pending_host_actions() {
    let mut core = core_at(SessionPhase::Lobby, None);
    feed(&mut core, &host(true));
    core.submit(&Intent::StartGame).unwrap();

    assert_eq!(
        core.receive(&wire(&host(true))),
        InboundOutcome::Applied(StateDelta::HostStatus(true))
    );
    assert!(core.snapshot().pending.is_none());
    assert!(core.submit(&Intent::Kick { target: pid("b") }).is_ok());

    feed(&mut core, &host(false));
    assert!(core.snapshot().pending.is_none());
    assert!(!core.snapshot().is_host);
    assert_eq!(
        core.receive(&wire(&host(false))),
        InboundOutcome::Applied(StateDelta::Unchanged)
    );
}

#[test]
fn pending_chat_cleared_by_own_echo_only() {
    let mut core = core_at(SessionPhase::DayDiscussion, Some(Role::Bystander));
    core.submit(&Intent::Chat {
        text: "it was b".into(),
    })
    .unwrap();

    feed(&mut core, &chat("b", "no it wasn't", None));
    assert!(core.snapshot().pending.is_some());

    feed(&mut core, &chat("a", "it was b", None));
    assert!(core.snapshot().pending.is_none());
}

#[test]
fn phase_change_clears_pending_vote() {
    let mut core = core_at(SessionPhase::DayVote, Some(Role::Bystander));
    core.submit(&Intent::Vote {
        target: Some(pid("b")),
    })
    .unwrap();
    assert!(core.snapshot().pending.is_some());

    feed(&mut core, &phase(SessionPhase::Resolution, 1));
    assert!(core.snapshot().pending.is_none());
}

#[test]
fn core_skips_unknown_events() {
    let mut core = core_at(SessionPhase::Lobby, None);
    let before = core.snapshot();
    let outcome = core.receive(r#"{"type":"confetti","payload":{}}"#);
    assert_eq!(
        outcome,
        InboundOutcome::Skipped {
            kind: "confetti".into()
        }
    );
    assert_eq!(core.snapshot(), before);
}

#[test]
fn malformed_event_asks_for_resync_and_resync_discards_state() {
    let mut core = core_at(SessionPhase::Night, Some(Role::Investigator));
    let outcome = core.receive(r#"{"type":"role-assigned","payload":{}}"#);
    assert!(matches!(outcome, InboundOutcome::NeedsResync { .. }));

    let version_before = core.snapshot().version;
    let request = core.resynchronize().unwrap();
    assert_eq!(decode_type(&request), "resync-request");

    let snapshot = core.snapshot();
    assert!(snapshot.version > version_before);
    assert!(snapshot.roster.is_empty());
    assert_eq!(snapshot.self_role, None);
    assert_eq!(snapshot.phase, SessionPhase::Lobby);
}

#[test]
fn subscribers_observe_every_commit() {
    let mut core = core_at(SessionPhase::Lobby, None);
    let mut rx = core.feed().subscribe();
    rx.borrow_and_update();

    feed(&mut core, &host(true));
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_host);
}

fn decode_type(raw: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(raw).unwrap();
    value["type"].as_str().unwrap().to_string()
}
