use thiserror::Error;
use tracing::{debug, info, warn};

use super::feed::{SessionSnapshot, SnapshotFeed};
use super::store::{SessionStore, StateDelta};
use crate::engine::{Gatekeeper, Intent, Rejection};
use crate::protocol::{self, ClientMessage, CodecError, ParticipantId};

const LOG_TARGET: &str = "session::pipeline";

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("not connected to the session")]
    NotConnected,
    #[error("session is closed")]
    SessionClosed,
    #[error(transparent)]
    Encode(#[from] CodecError),
}

/// Result of feeding one inbound wire message through the core.
#[derive(Debug, PartialEq, Eq)]
pub enum InboundOutcome {
    Applied(StateDelta),
    /// Unknown event type; logged and skipped.
    Skipped { kind: String },
    /// Local state can no longer be trusted.
    NeedsResync { reason: String },
    /// The controller removed us from the session.
    Kicked { reason: String },
}

/// Who we are in the session, as far as the client knows when it connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalIdentity {
    /// Id assigned by the lobby.
    Id(ParticipantId),
    /// The lobby did not return an id; find our row in the roster by name.
    DisplayName(String),
}

impl LocalIdentity {
    fn placeholder(&self) -> ParticipantId {
        match self {
            LocalIdentity::Id(id) => id.clone(),
            LocalIdentity::DisplayName(name) => ParticipantId::new(name.clone()),
        }
    }
}

impl From<ParticipantId> for LocalIdentity {
    fn from(id: ParticipantId) -> Self {
        LocalIdentity::Id(id)
    }
}

/// Codec, store and gatekeeper behind one synchronous, single-owner API.
/// The async driver owns exactly one of these per session.
pub struct SessionCore {
    feed: SnapshotFeed,
    store: SessionStore,
}

impl SessionCore {
    pub fn new(identity: impl Into<LocalIdentity>) -> Self {
        let identity = identity.into();
        let feed = SnapshotFeed::new(identity.placeholder());
        let store = Self::fresh_store(identity, &feed);
        Self { feed, store }
    }

    fn fresh_store(identity: LocalIdentity, feed: &SnapshotFeed) -> SessionStore {
        match identity {
            LocalIdentity::Id(id) => SessionStore::new(id, feed.clone()),
            LocalIdentity::DisplayName(name) => SessionStore::provisional(name, feed.clone()),
        }
    }

    pub fn feed(&self) -> &SnapshotFeed {
        &self.feed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.feed.current()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn receive(&mut self, raw: &str) -> InboundOutcome {
        let event = match protocol::decode(raw) {
            Ok(event) => event,
            Err(err) if err.requires_resync() => {
                warn!(target = LOG_TARGET, error = %err, "undecodable event");
                return InboundOutcome::NeedsResync {
                    reason: err.to_string(),
                };
            }
            Err(err) => {
                let kind = err.event_kind().unwrap_or_default().to_string();
                debug!(target = LOG_TARGET, %kind, "skipping unknown event");
                return InboundOutcome::Skipped { kind };
            }
        };

        match self.store.apply(event) {
            StateDelta::Kicked { reason } => InboundOutcome::Kicked { reason },
            delta if delta.requires_resync() => InboundOutcome::NeedsResync {
                reason: format!("{delta:?}"),
            },
            delta => InboundOutcome::Applied(delta),
        }
    }

    /// Gatekeep `intent` and encode the single message it produces.
    pub fn submit(&mut self, intent: &Intent) -> Result<String, SubmitError> {
        let message = Gatekeeper::submit(&mut self.store, intent)?;
        protocol::encode(&message).map_err(|err| {
            self.store.clear_pending();
            SubmitError::from(err)
        })
    }

    /// Throw away all local state and produce the resync request to send
    /// before any further event is applied.
    pub fn resynchronize(&mut self) -> Result<String, CodecError> {
        self.discard();
        info!(target = LOG_TARGET, "requesting resynchronization");
        protocol::encode(&ClientMessage::ResyncRequest)
    }

    /// Replace the store with a fresh, empty one. An id learned from the
    /// roster survives; a name still unresolved is looked up again.
    pub fn discard(&mut self) {
        let identity = match self.store.unresolved_name() {
            Some(name) => LocalIdentity::DisplayName(name.to_string()),
            None => LocalIdentity::Id(self.store.state().self_id.clone()),
        };
        self.store = Self::fresh_store(identity, &self.feed);
    }
}
