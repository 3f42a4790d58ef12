//! Plain-text rendering of snapshots for the terminal client.

use std::fmt::Write;

use crate::connection::ConnectionStatus;
use crate::engine::LegalActions;
use crate::protocol::{Alignment, NightAction, Role, Winner};
use crate::session::{Participant, SessionState};

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::LeaderFaction => "Don",
        Role::FactionMember => "Mafia",
        Role::Investigator => "Sheriff",
        Role::Bystander => "Civilian",
    }
}

pub fn winner_line(winner: Winner) -> &'static str {
    match winner {
        Winner::Faction => "🔪 The mafia wins",
        Winner::Town => "🏡 The town wins",
    }
}

pub fn alignment_name(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Faction => "mafia",
        Alignment::Town => "town",
    }
}

pub fn status_line(status: &ConnectionStatus) -> String {
    match status {
        ConnectionStatus::Disconnected => "disconnected".to_string(),
        ConnectionStatus::Connecting { attempt } => format!("connecting (attempt {attempt})"),
        ConnectionStatus::Open => "connected".to_string(),
        ConnectionStatus::Reconnecting { attempt, delay } => {
            format!("connection lost, retry {attempt} in {}ms", delay.as_millis())
        }
        ConnectionStatus::Closing => "leaving".to_string(),
        ConnectionStatus::Failed { reason } => format!("❌ could not reach the server: {reason}"),
        ConnectionStatus::Closed => "left the session".to_string(),
        ConnectionStatus::Kicked { reason } => format!("❌ removed from the session: {reason}"),
    }
}

fn participant_line(state: &SessionState, p: &Participant) -> String {
    let mut line = format!("  {} ({})", p.name, p.id);
    if p.id == state.self_id {
        line.push_str(" [you]");
    }
    if !p.alive {
        line.push_str(" ☠");
    } else if state.phase == crate::protocol::SessionPhase::Lobby && p.ready {
        line.push_str(" ✅ ready");
    }
    if let Some(role) = p.revealed_role {
        let _ = write!(line, " - {}", role_name(role));
    } else if let Some(alignment) = state.investigation(&p.id) {
        let _ = write!(line, " 🔎 {}", alignment_name(alignment));
    }
    line
}

fn actions_line(legal: &LegalActions) -> Option<String> {
    let mut options = Vec::new();
    if legal.may_toggle_ready {
        options.push("ready/unready");
    }
    if legal.may_start_game {
        options.push("start");
    }
    if legal.may_kick {
        options.push("kick <name>");
    }
    match legal.night_action {
        Some(NightAction::Kill) => options.push("target <name> (kill)"),
        Some(NightAction::Investigate) => options.push("target <name> (investigate)"),
        None => {}
    }
    if legal.may_chat {
        options.push("say <text>");
    }
    if legal.may_vote {
        options.push("vote <name> | abstain");
    }
    (!options.is_empty()).then(|| format!("Options: {}", options.join(", ")))
}

/// Full screen for one snapshot.
pub fn render(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n🎭 {}", "-".repeat(40));
    let _ = write!(out, "Phase: {}", state.phase.description());
    if state.phase.is_active() {
        let _ = write!(out, " (round {})", state.round);
    }
    out.push('\n');

    if let Some(role) = state.self_role {
        let _ = writeln!(out, "Your role: {}", role_name(role));
    }
    if state.is_host {
        out.push_str("You are the host\n");
    }
    if let Some(note) = &state.phase_note {
        let _ = writeln!(out, "📢 {note}");
    }
    if let Some(id) = &state.last_eliminated {
        let _ = writeln!(out, "☠ {} was eliminated", state.display_name(id));
    }
    if let Some(winner) = state.winner {
        let _ = writeln!(out, "{}", winner_line(winner));
    }

    let _ = writeln!(out, "Participants ({} alive):", state.living().count());
    for p in &state.roster {
        let _ = writeln!(out, "{}", participant_line(state, p));
    }

    for entry in state.chat.iter().rev().take(5).rev() {
        let _ = writeln!(out, "💬 {}: {}", state.display_name(&entry.sender), entry.text);
    }

    if let Some(pending) = &state.pending {
        let _ = writeln!(out, "⏳ waiting for the server to confirm {:?}", pending.kind);
    }
    if let Some(line) = actions_line(&state.legal_actions()) {
        let _ = writeln!(out, "{line}");
    }
    out
}
