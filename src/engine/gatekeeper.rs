use tracing::debug;

use super::actions::Intent;
use super::errors::Rejection;
use super::legals::{phase_allows, role_allows};
use crate::protocol::{ClientMessage, ParticipantId, Role};
use crate::session::{PendingAction, SessionState, SessionStore};

const LOG_TARGET: &str = "engine::gatekeeper";

/// Local admission check for user intents. A UX filter only: the controller
/// re-validates everything it receives.
pub struct Gatekeeper;

impl Gatekeeper {
    /// Validate `intent` against the current state and build the message it
    /// would send. Does not touch state.
    pub fn check(state: &SessionState, intent: &Intent) -> Result<ClientMessage, Rejection> {
        let kind = intent.kind();

        if !phase_allows(state.phase, kind) {
            return Err(Rejection::WrongPhase);
        }
        if !state.is_alive(&state.self_id) {
            return Err(Rejection::NotAlive);
        }
        role_allows(kind, state.self_role, state.is_host)?;
        if state.pending.is_some() {
            return Err(Rejection::AlreadyPending);
        }

        let message = match intent {
            Intent::ReadyToggle { ready } => ClientMessage::ReadyToggle { ready: *ready },
            Intent::StartGame => ClientMessage::StartGame,
            Intent::NightTarget { target } => {
                let action = state
                    .self_role
                    .and_then(Role::night_action)
                    .ok_or(Rejection::RoleNotPermitted)?;
                ClientMessage::NightTarget {
                    target: Self::living_other(state, target)?,
                    action,
                }
            }
            Intent::Vote { target } => ClientMessage::Vote {
                target: target
                    .as_ref()
                    .map(|target| Self::living_other(state, target))
                    .transpose()?,
            },
            Intent::Chat { text } => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(Rejection::EmptyMessage);
                }
                ClientMessage::Chat {
                    text: text.to_string(),
                }
            }
            Intent::Kick { target } => ClientMessage::KickRequest {
                target: Self::living_other(state, target)?,
            },
        };

        Ok(message)
    }

    /// Check `intent` and, if admitted, mark it pending on the store.
    pub fn submit(store: &mut SessionStore, intent: &Intent) -> Result<ClientMessage, Rejection> {
        let state = store.state();
        let message = Self::check(state, intent).inspect_err(|reason| {
            debug!(target = LOG_TARGET, kind = ?intent.kind(), %reason, "intent rejected");
        })?;
        let pending = PendingAction::for_intent(intent, state.phase, state.round);
        store.mark_pending(pending);
        Ok(message)
    }

    fn living_other(
        state: &SessionState,
        target: &ParticipantId,
    ) -> Result<ParticipantId, Rejection> {
        state
            .targets()
            .find(|p| &p.id == target)
            .map(|p| p.id.clone())
            .ok_or(Rejection::InvalidTarget)
    }
}

