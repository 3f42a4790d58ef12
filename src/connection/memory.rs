//! In-process channel pair for driving a client in tests without a network.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::transport::{Channel, ChannelError, Connector};
use crate::protocol::{ClientMessage, ServerEvent};

/// Connector whose attempts are answered by a [`MemoryServer`].
pub struct MemoryConnector {
    attempts: Mutex<mpsc::UnboundedReceiver<Result<MemoryChannel, ChannelError>>>,
}

/// Test-side control for a [`MemoryConnector`].
pub struct MemoryServer {
    attempts: mpsc::UnboundedSender<Result<MemoryChannel, ChannelError>>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                attempts: Mutex::new(rx),
            },
            MemoryServer { attempts: tx },
        )
    }
}

impl MemoryServer {
    /// Answer the next connection attempt with an open channel.
    pub fn accept(&self) -> MemoryPeer {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        let _ = self.attempts.send(Ok(MemoryChannel {
            inbound,
            outbound,
        }));
        MemoryPeer {
            to_client: Some(to_client),
            from_client,
        }
    }

    /// Fail the next connection attempt.
    pub fn refuse(&self, reason: &str) {
        let _ = self
            .attempts
            .send(Err(ChannelError::Connect(reason.to_string())));
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Channel = MemoryChannel;

    async fn connect(&self) -> Result<MemoryChannel, ChannelError> {
        self.attempts
            .lock()
            .await
            .recv()
            .await
            .unwrap_or_else(|| Err(ChannelError::Connect("memory server gone".to_string())))
    }
}

pub struct MemoryChannel {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Channel for MemoryChannel {
    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.outbound.send(text).map_err(|_| ChannelError::Closed)
    }

    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        Ok(self.inbound.recv().await)
    }

    async fn keepalive(&mut self) -> Result<(), ChannelError> {
        if self.outbound.is_closed() {
            return Err(ChannelError::Closed);
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// The controller's end of one accepted [`MemoryChannel`].
pub struct MemoryPeer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    pub fn send_event(&self, event: &ServerEvent) {
        if let Ok(raw) = serde_json::to_string(event) {
            self.send_raw(&raw);
        }
    }

    pub fn send_raw(&self, raw: &str) {
        if let Some(tx) = &self.to_client {
            let _ = tx.send(raw.to_string());
        }
    }

    /// Next message the client sent, or `None` once the client is gone.
    pub async fn next_message(&mut self) -> Option<ClientMessage> {
        let raw = self.from_client.recv().await?;
        serde_json::from_str(&raw).ok()
    }

    pub fn try_next_message(&mut self) -> Option<ClientMessage> {
        let raw = self.from_client.try_recv().ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Drop the server side of the channel as if the connection reset.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }
}
