use std::time::Duration;

use url::Url;

use crate::connection::ReconnectPolicy;

/// Everything a session client needs to find, join and stay connected to a
/// session controller.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP base of the controller, e.g. `http://localhost:8080`.
    pub server_url: Url,
    pub display_name: String,
    /// Join this session instead of creating a new one.
    pub session_id: Option<String>,
    pub handshake_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub reconnect: ReconnectPolicy,
    pub command_capacity: usize,
}

impl ClientConfig {
    pub fn new(server_url: Url, display_name: impl Into<String>) -> Self {
        Self {
            server_url,
            display_name: display_name.into(),
            session_id: None,
            handshake_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(15),
            reconnect: ReconnectPolicy::default(),
            command_capacity: 32,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }
}
