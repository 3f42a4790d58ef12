use std::sync::Arc;

use tokio::sync::watch;

use super::state::SessionState;
use crate::protocol::ParticipantId;

pub type SessionSnapshot = Arc<SessionState>;

/// Presentation-facing stream of snapshots. Outlives any single store so
/// subscribers keep their receiver across resyncs.
#[derive(Clone)]
pub struct SnapshotFeed {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl SnapshotFeed {
    pub fn new(self_id: ParticipantId) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SessionState::new(self_id)));
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn publish(&self, state: SessionState) {
        self.tx.send_replace(Arc::new(state));
    }
}
