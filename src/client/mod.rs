//! Async driver: owns one `SessionCore` and one channel at a time, and
//! exposes snapshots, status and intent submission to the UI.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{
    Channel, ChannelError, ConnectionLifecycle, ConnectionStatus, Connector, OpenKind, Recovery,
};
use crate::engine::Intent;
use crate::session::{InboundOutcome, LocalIdentity, SessionCore, SessionSnapshot, SubmitError};

const LOG_TARGET: &str = "client";

enum Command {
    Submit {
        intent: Intent,
        reply: oneshot::Sender<Result<(), SubmitError>>,
    },
}

/// Handle to a running session. Dropping it leaves the session.
pub struct SessionClient {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    status: watch::Receiver<ConnectionStatus>,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionClient {
    pub fn spawn<C: Connector>(
        config: &ClientConfig,
        identity: impl Into<LocalIdentity>,
        connector: C,
    ) -> Self {
        let core = SessionCore::new(identity);
        let snapshots = core.feed().subscribe();
        let (status_tx, status) = watch::channel(ConnectionStatus::Disconnected);
        let (commands, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let stop = CancellationToken::new();

        let driver = Driver {
            config: config.clone(),
            connector,
            core,
            lifecycle: ConnectionLifecycle::new(config.reconnect.clone()),
            status: status_tx,
            commands: command_rx,
            stop: stop.clone(),
        };
        let task = spawn_driver(format!("session-client-{}", config.display_name), driver.run());

        Self {
            commands,
            snapshots,
            status,
            stop,
            task: Some(task),
        }
    }

    /// Receiver that observes every published snapshot.
    pub fn snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Gatekeep and send one intent. Resolves with the local verdict; it does
    /// not wait for the controller to reflect the action.
    pub async fn submit(&self, intent: Intent) -> Result<(), SubmitError> {
        let (reply, verdict) = oneshot::channel();
        self.commands
            .send(Command::Submit { intent, reply })
            .await
            .map_err(|_| SubmitError::SessionClosed)?;
        verdict.await.map_err(|_| SubmitError::SessionClosed)?
    }

    /// Close the channel, discard local state and wait for the driver to stop.
    pub async fn leave(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                warn!(target = LOG_TARGET, error = %err, "session driver panicked");
            }
        }
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

enum PumpEnd {
    Stopped,
    Kicked(String),
    Dropped(ChannelError),
}

struct Driver<C: Connector> {
    config: ClientConfig,
    connector: C,
    core: SessionCore,
    lifecycle: ConnectionLifecycle,
    status: watch::Sender<ConnectionStatus>,
    commands: mpsc::Receiver<Command>,
    stop: CancellationToken,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        info!(target = LOG_TARGET, "starting session client");
        loop {
            let status = self.lifecycle.connecting().clone();
            self.publish(status);

            let failure = match self.connect().await {
                None => break,
                Some(Ok(mut channel)) => {
                    let open = self.lifecycle.opened();
                    self.publish(ConnectionStatus::Open);
                    info!(target = LOG_TARGET, ?open, "channel open");

                    match self.pump(&mut channel, open).await {
                        PumpEnd::Stopped => break,
                        PumpEnd::Kicked(reason) => {
                            warn!(target = LOG_TARGET, %reason, "kicked from session");
                            channel.close().await;
                            self.core.discard();
                            self.lifecycle.kicked(reason);
                            break;
                        }
                        PumpEnd::Dropped(err) => err,
                    }
                }
                Some(Err(err)) => err,
            };

            warn!(target = LOG_TARGET, error = %failure, "connection lost");
            match self.lifecycle.dropped(failure.to_string()) {
                Recovery::RetryAfter(delay) => {
                    let status = self.lifecycle.status().clone();
                    self.publish(status);
                    debug!(
                        target = LOG_TARGET,
                        delay_ms = delay.as_millis() as u64,
                        "waiting before reconnect attempt"
                    );
                    if !self.idle(delay).await {
                        break;
                    }
                }
                Recovery::GiveUp => {
                    warn!(target = LOG_TARGET, "retry ceiling reached, giving up");
                    self.core.discard();
                    break;
                }
            }
        }

        if self.stop.is_cancelled() {
            self.core.discard();
        }
        self.lifecycle.closed();
        let status = self.lifecycle.status().clone();
        self.publish(status);
        self.reject_remaining();
        info!(target = LOG_TARGET, "session client stopped");
    }

    /// One connection attempt, answering commands with `NotConnected` while
    /// it is in flight. `None` when asked to stop. The connector owns the
    /// handshake timeout.
    async fn connect(&mut self) -> Option<Result<C::Channel, ChannelError>> {
        let attempt = self.connector.connect();
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => return None,
                result = &mut attempt => return Some(result),
                Some(command) = self.commands.recv() => reject_offline(command),
            }
        }
    }

    /// Sleep out a backoff delay. Returns false when asked to stop.
    async fn idle(&mut self, delay: std::time::Duration) -> bool {
        let wait = sleep(delay);
        tokio::pin!(wait);

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => return false,
                _ = &mut wait => return true,
                Some(command) = self.commands.recv() => reject_offline(command),
            }
        }
    }

    async fn pump(&mut self, channel: &mut C::Channel, open: OpenKind) -> PumpEnd {
        if open == OpenKind::Reconnect {
            if let Err(err) = self.resynchronize(channel).await {
                return PumpEnd::Dropped(err);
            }
        }

        let period = self.config.heartbeat_interval;
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => {
                    debug!(target = LOG_TARGET, "leaving session");
                    self.lifecycle.closing();
                    self.publish(ConnectionStatus::Closing);
                    channel.close().await;
                    return PumpEnd::Stopped;
                }
                _ = heartbeat.tick() => {
                    if let Err(err) = channel.keepalive().await {
                        return PumpEnd::Dropped(err);
                    }
                }
                Some(command) = self.commands.recv() => {
                    let Command::Submit { intent, reply } = command;
                    let (verdict, sent) = match self.core.submit(&intent) {
                        Ok(raw) => match channel.send(raw).await {
                            Ok(()) => (Ok(()), Ok(())),
                            Err(err) => (Err(SubmitError::NotConnected), Err(err)),
                        },
                        Err(err) => (Err(err), Ok(())),
                    };
                    let _ = reply.send(verdict);
                    if let Err(err) = sent {
                        return PumpEnd::Dropped(err);
                    }
                }
                inbound = channel.recv() => {
                    let raw = match inbound {
                        Ok(Some(raw)) => raw,
                        Ok(None) => return PumpEnd::Dropped(ChannelError::Closed),
                        Err(err) => return PumpEnd::Dropped(err),
                    };
                    match self.core.receive(&raw) {
                        InboundOutcome::Applied(_) | InboundOutcome::Skipped { .. } => {}
                        InboundOutcome::Kicked { reason } => return PumpEnd::Kicked(reason),
                        InboundOutcome::NeedsResync { reason } => {
                            warn!(target = LOG_TARGET, %reason, "local state out of sync");
                            if let Err(err) = self.resynchronize(channel).await {
                                return PumpEnd::Dropped(err);
                            }
                        }
                    }
                }
            }
        }
    }

    async fn resynchronize(&mut self, channel: &mut C::Channel) -> Result<(), ChannelError> {
        match self.core.resynchronize() {
            Ok(raw) => channel.send(raw).await,
            Err(err) => {
                warn!(target = LOG_TARGET, error = %err, "failed to encode resync request");
                Ok(())
            }
        }
    }

    fn publish(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    fn reject_remaining(&mut self) {
        self.commands.close();
        while let Ok(Command::Submit { reply, .. }) = self.commands.try_recv() {
            let _ = reply.send(Err(SubmitError::SessionClosed));
        }
    }
}

/// Name the driver task under `tokio_unstable`; otherwise run it inside a
/// span carrying the name.
fn spawn_driver<F>(name: String, future: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    #[cfg(tokio_unstable)]
    {
        match tokio::task::Builder::new().name(&name).spawn(future) {
            Ok(handle) => handle,
            Err(err) => panic!("failed to spawn {name}: {err}"),
        }
    }
    #[cfg(not(tokio_unstable))]
    {
        use tracing::Instrument;
        tokio::spawn(future.instrument(tracing::info_span!("session", task_name = %name)))
    }
}

fn reject_offline(command: Command) {
    let Command::Submit { reply, .. } = command;
    let _ = reply.send(Err(SubmitError::NotConnected));
}
