use std::time::Duration;

use serde::Serialize;

use super::backoff::ReconnectPolicy;

/// Connection status as seen by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting { attempt: u32 },
    Open,
    Reconnecting { attempt: u32, delay: Duration },
    Closing,
    /// Retry ceiling reached. Terminal.
    Failed { reason: String },
    /// Left on purpose. Terminal.
    Closed,
    /// Removed by the controller. Terminal.
    Kicked { reason: String },
}

impl ConnectionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Failed { .. } | ConnectionStatus::Closed | ConnectionStatus::Kicked { .. }
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionStatus::Open)
    }
}

/// Whether an open channel is the first for this client or a reconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenKind {
    First,
    Reconnect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recovery {
    RetryAfter(Duration),
    GiveUp,
}

/// Pure connection state machine. The driver performs the I/O and reports
/// what happened; this decides what status to show and whether to retry.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    policy: ReconnectPolicy,
    status: ConnectionStatus,
    failures: u32,
    ever_opened: bool,
}

impl ConnectionLifecycle {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            status: ConnectionStatus::Disconnected,
            failures: 0,
            ever_opened: false,
        }
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn connecting(&mut self) -> &ConnectionStatus {
        self.status = ConnectionStatus::Connecting {
            attempt: self.failures + 1,
        };
        &self.status
    }

    pub fn opened(&mut self) -> OpenKind {
        self.failures = 0;
        self.status = ConnectionStatus::Open;
        if std::mem::replace(&mut self.ever_opened, true) {
            OpenKind::Reconnect
        } else {
            OpenKind::First
        }
    }

    /// A connect attempt failed or an open channel dropped.
    pub fn dropped(&mut self, reason: impl Into<String>) -> Recovery {
        self.failures += 1;
        match self.policy.next_delay(self.failures) {
            Some(delay) => {
                self.status = ConnectionStatus::Reconnecting {
                    attempt: self.failures,
                    delay,
                };
                Recovery::RetryAfter(delay)
            }
            None => {
                self.status = ConnectionStatus::Failed {
                    reason: reason.into(),
                };
                Recovery::GiveUp
            }
        }
    }

    pub fn closing(&mut self) {
        if !self.status.is_terminal() {
            self.status = ConnectionStatus::Closing;
        }
    }

    pub fn closed(&mut self) {
        if !self.status.is_terminal() {
            self.status = ConnectionStatus::Closed;
        }
    }

    pub fn kicked(&mut self, reason: impl Into<String>) {
        self.status = ConnectionStatus::Kicked {
            reason: reason.into(),
        };
    }
}
