use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

use super::transport::{Channel, ChannelError, Connector};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const LOG_TARGET: &str = "connection::websocket";

/// Connects to the session controller's websocket endpoint.
#[derive(Debug, Clone)]
pub struct WsConnector {
    pub url: Url,
    pub handshake_timeout: Duration,
}

impl WsConnector {
    pub fn new(url: Url, handshake_timeout: Duration) -> Self {
        Self {
            url,
            handshake_timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&self) -> Result<WsChannel, ChannelError> {
        let (stream, response) = timeout(self.handshake_timeout, connect_async(self.url.to_string()))
            .await
            .map_err(|_| ChannelError::HandshakeTimeout(self.handshake_timeout))?
            .map_err(|err| ChannelError::Connect(err.to_string()))?;

        debug!(
            target = LOG_TARGET,
            url = %self.url,
            status = %response.status(),
            "websocket handshake complete"
        );
        Ok(WsChannel { stream })
    }
}

pub struct WsChannel {
    stream: WsStream,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, ChannelError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Ping(payload))) => {
                    self.stream.send(Message::Pong(payload)).await.ok();
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(target = LOG_TARGET, ?frame, "socket closed by server");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(ChannelError::Transport(err.to_string())),
                None => return Ok(None),
            }
        }
    }

    async fn keepalive(&mut self) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Ping(Vec::new()))
            .await
            .map_err(|err| ChannelError::Transport(err.to_string()))
    }

    async fn close(&mut self) {
        if let Err(err) = self.stream.close(None).await {
            debug!(target = LOG_TARGET, error = %err, "close handshake failed");
        }
    }
}
