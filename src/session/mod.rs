//! Local view of the session: one owned state record, changed only by
//! applying controller events.

pub mod feed;
pub mod pipeline;
pub mod state;
pub mod store;

pub use feed::{SessionSnapshot, SnapshotFeed};
pub use pipeline::{InboundOutcome, LocalIdentity, SessionCore, SubmitError};
pub use state::*;
pub use store::{SessionStore, StateDelta};

#[cfg(test)]
mod tests;
