use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect: {0}")]
    Connect(String),
    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
    #[error("channel closed by peer")]
    Closed,
    #[error("transport error: {0}")]
    Transport(String),
}

/// An open, ordered, bidirectional text channel to the session controller.
///
/// `recv` must be cancel safe: the driver polls it inside `tokio::select!`.
#[async_trait]
pub trait Channel: Send {
    async fn send(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text frame. `Ok(None)` means the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<String>, ChannelError>;

    /// Liveness probe sent on the heartbeat interval.
    async fn keepalive(&mut self) -> Result<(), ChannelError>;

    async fn close(&mut self);
}

/// Opens channels. Called once per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Channel: Channel + 'static;

    async fn connect(&self) -> Result<Self::Channel, ChannelError>;
}
