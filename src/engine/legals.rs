use super::actions::IntentKind;
use super::errors::Rejection;
use crate::protocol::{NightAction, Role, SessionPhase};

/// What the local participant may do right now. Drives which controls the
/// presentation layer offers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalActions {
    pub may_toggle_ready: bool,
    pub may_start_game: bool,
    pub may_kick: bool,
    pub night_action: Option<NightAction>,
    pub may_chat: bool,
    pub may_vote: bool,
}

impl LegalActions {
    pub fn is_empty(&self) -> bool {
        *self == LegalActions::default()
    }
}

/// Whether any alive participant could submit `kind` in `phase`.
pub fn phase_allows(phase: SessionPhase, kind: IntentKind) -> bool {
    use IntentKind::*;
    match phase {
        SessionPhase::Lobby => matches!(kind, ReadyToggle | StartGame | Kick),
        SessionPhase::Night => kind == NightTarget,
        SessionPhase::DayDiscussion => kind == Chat,
        SessionPhase::DayVote => kind == Vote,
        SessionPhase::RoleAssignment | SessionPhase::Resolution | SessionPhase::Ended => false,
    }
}

/// Role and host gate for an intent the phase already allows.
pub fn role_allows(kind: IntentKind, role: Option<Role>, is_host: bool) -> Result<(), Rejection> {
    match kind {
        IntentKind::NightTarget => role
            .and_then(Role::night_action)
            .map(|_| ())
            .ok_or(Rejection::RoleNotPermitted),
        IntentKind::StartGame | IntentKind::Kick if !is_host => Err(Rejection::NotHost),
        _ => Ok(()),
    }
}

pub fn legal_actions(
    phase: SessionPhase,
    role: Option<Role>,
    alive: bool,
    is_host: bool,
) -> LegalActions {
    if !alive {
        return LegalActions::default();
    }
    let allowed =
        |kind: IntentKind| phase_allows(phase, kind) && role_allows(kind, role, is_host).is_ok();

    LegalActions {
        may_toggle_ready: allowed(IntentKind::ReadyToggle),
        may_start_game: allowed(IntentKind::StartGame),
        may_kick: allowed(IntentKind::Kick),
        night_action: if allowed(IntentKind::NightTarget) {
            role.and_then(Role::night_action)
        } else {
            None
        },
        may_chat: allowed(IntentKind::Chat),
        may_vote: allowed(IntentKind::Vote),
    }
}
