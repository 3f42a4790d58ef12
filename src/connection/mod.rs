//! Channel plumbing and the reconnect state machine.

pub mod backoff;
pub mod lifecycle;
#[cfg(test)]
pub mod memory;
pub mod transport;
pub mod websocket;

pub use backoff::ReconnectPolicy;
pub use lifecycle::{ConnectionLifecycle, ConnectionStatus, OpenKind, Recovery};
#[cfg(test)]
pub use memory::{MemoryChannel, MemoryConnector, MemoryPeer, MemoryServer};
pub use transport::{Channel, ChannelError, Connector};
pub use websocket::{WsChannel, WsConnector};
