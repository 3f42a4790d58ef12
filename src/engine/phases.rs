//! Session phase transitions

use crate::protocol::SessionPhase;

impl SessionPhase {
    /// Phases in which the game itself is running (roles exist).
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionPhase::Lobby | SessionPhase::Ended)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Ended)
    }

    /// Phases the controller may move to from here.
    pub fn successors(&self) -> &'static [SessionPhase] {
        use SessionPhase::*;
        match self {
            Lobby => &[RoleAssignment],
            RoleAssignment => &[Night, Ended],
            Night => &[DayDiscussion, Ended],
            DayDiscussion => &[DayVote, Ended],
            DayVote => &[Resolution, Ended],
            Resolution => &[Night, Ended],
            Ended => &[],
        }
    }

    pub fn can_advance_to(&self, next: SessionPhase) -> bool {
        self.successors().contains(&next)
    }

    pub fn description(&self) -> &'static str {
        match self {
            SessionPhase::Lobby => "Waiting for players",
            SessionPhase::RoleAssignment => "Roles are being dealt",
            SessionPhase::Night => "Night falls",
            SessionPhase::DayDiscussion => "Day discussion",
            SessionPhase::DayVote => "Day vote",
            SessionPhase::Resolution => "Counting the votes",
            SessionPhase::Ended => "Game over",
        }
    }
}

/// Outcome of checking a controller-driven phase change against the
/// local phase and round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseStep {
    /// Legal edge; apply it.
    Advance,
    /// Same phase and round as now; already applied.
    Duplicate,
    /// Older round than the one we hold; reordered delivery.
    Stale,
    /// The game is over; only a new game may follow.
    AfterEnd,
    /// Apply anyway, but events were evidently missed.
    Skipped,
}

pub fn classify_step(
    current: SessionPhase,
    current_round: u32,
    next: SessionPhase,
    next_round: u32,
) -> PhaseStep {
    if current.is_terminal() {
        return PhaseStep::AfterEnd;
    }
    if next_round < current_round {
        return PhaseStep::Stale;
    }
    if next == current && next_round == current_round {
        return PhaseStep::Duplicate;
    }
    if current.can_advance_to(next) {
        PhaseStep::Advance
    } else {
        PhaseStep::Skipped
    }
}
