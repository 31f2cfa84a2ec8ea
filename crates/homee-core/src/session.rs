// ── Session ──
//
// Full lifecycle of one connection to a hub: token acquisition, the push
// channel with its concurrent send and receive loops, the reconnect loop,
// and the outbound command queue. Inbound frames are handed to the
// dispatcher, which keeps the DataStore current and emits events.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use homee_api::websocket::{self, HubStream};
use homee_api::{AccessToken, TokenClient};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, trace, warn};

use crate::command::Command;
use crate::config::HubConfig;
use crate::dispatch::Dispatcher;
use crate::error::CoreError;
use crate::events::{EventHub, HubEvent};
use crate::gate::Gate;
use crate::model::{AttributeId, HomeegramId, NodeId};
use crate::store::DataStore;

const COMMAND_CHANNEL_SIZE: usize = 64;
const FLUSH_POLL: Duration = Duration::from_millis(10);

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Authenticating,
    Connecting,
    Open,
    Reconnecting { attempt: u32 },
    Closing,
    Closed,
}

// ── Session ──────────────────────────────────────────────────────────

/// A stateful client for one hub.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Call [`run`](Self::run) (or
/// [`start`](Self::start) to spawn it) to connect; the call returns when
/// the session is stopped with [`disconnect`](Self::disconnect) or gives
/// up after `max_retries` consecutive failures.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: HubConfig,
    tokens: TokenClient,
    store: Arc<DataStore>,
    events: EventHub,
    dispatcher: Dispatcher,
    state: watch::Sender<ConnectionState>,
    connected: AtomicBool,
    retries: AtomicU32,
    /// Stop flag for the current `run`. Replaced each time a run begins.
    stop: Mutex<CancellationToken>,
    command_tx: mpsc::Sender<String>,
    command_rx: tokio::sync::Mutex<mpsc::Receiver<String>>,
    snapshot_ready: Gate,
    closed: Gate,
    span: tracing::Span,
}

impl Session {
    /// Create a session with its own event hub. Does NOT connect.
    pub fn new(config: HubConfig) -> Result<Self, CoreError> {
        Self::with_events(config, EventHub::new())
    }

    /// Create a session that reports through an existing event hub.
    pub fn with_events(config: HubConfig, events: EventHub) -> Result<Self, CoreError> {
        config.validate()?;

        let tokens = TokenClient::new(
            config.base_url()?,
            config.username.clone(),
            &config.password,
            config.device_name.clone(),
            config.request_timeout,
        )?;

        let store = Arc::new(DataStore::new());
        let snapshot_ready = Gate::new();
        let dispatcher =
            Dispatcher::with_gate(Arc::clone(&store), events.clone(), snapshot_ready.clone());
        let (state, _) = watch::channel(ConnectionState::Idle);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let span = tracing::info_span!(
            "homee_session",
            host = %config.host,
            device = %config.device_name
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                tokens,
                store,
                events,
                dispatcher,
                state,
                connected: AtomicBool::new(false),
                retries: AtomicU32::new(0),
                stop: Mutex::new(CancellationToken::new()),
                command_tx,
                command_rx: tokio::sync::Mutex::new(command_rx),
                snapshot_ready,
                closed: Gate::new(),
                span,
            }),
        })
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// The entity mirror. Read-only from the outside.
    pub fn store(&self) -> &Arc<DataStore> {
        &self.inner.store
    }

    pub fn events(&self) -> &EventHub {
        &self.inner.events
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn retries(&self) -> u32 {
        self.inner.retries.load(Ordering::SeqCst)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Connect and keep reconnecting until stopped or out of retries.
    ///
    /// The first attempt always happens. Returns `Ok(())` after
    /// [`disconnect`](Self::disconnect) or when reconnecting is disabled,
    /// and `Err(MaxRetriesExceeded)` once the retry budget is spent.
    pub async fn run(&self) -> Result<(), CoreError> {
        let stop = self.inner.arm_stop();
        self.drive(stop)
            .instrument(self.inner.span.clone())
            .await
    }

    /// Spawn [`run`](Self::run) on the current tokio runtime.
    pub fn start(&self) -> JoinHandle<Result<(), CoreError>> {
        let stop = self.inner.arm_stop();
        let session = self.clone();
        let span = self.inner.span.clone();
        tokio::spawn(async move { session.drive(stop).instrument(span).await })
    }

    /// Ask the session to stop. Loops unwind at their next await point;
    /// an open socket is closed with a close frame.
    pub fn disconnect(&self) {
        info!(parent: &self.inner.span, "disconnect requested");
        self.inner.stop_token().cancel();
    }

    /// Resolve once the full snapshot of the current connection is applied.
    pub async fn wait_until_connected(&self) {
        self.inner.snapshot_ready.wait().await;
    }

    /// Resolve once the current connection is confirmed closed.
    pub async fn wait_until_disconnected(&self) {
        self.inner.closed.wait().await;
    }

    // ── Outbound commands ────────────────────────────────────────────

    /// Queue a raw command frame. Returns `false` (and drops it) when not
    /// connected, while closing, or when the queue is full.
    pub fn send(&self, command: impl Into<String>) -> bool {
        self.inner.send(command.into())
    }

    /// Resolve once every queued command has been taken by the send loop,
    /// or the connection is gone.
    pub async fn flush(&self) {
        let tx = &self.inner.command_tx;
        while tx.capacity() < tx.max_capacity() && self.is_connected() {
            tokio::time::sleep(FLUSH_POLL).await;
        }
    }

    pub fn execute(&self, command: &Command) -> bool {
        self.send(command.to_string())
    }

    pub fn request_all(&self) -> bool {
        self.execute(&Command::GetAll)
    }

    pub fn update_node(&self, node: NodeId) -> bool {
        self.execute(&Command::GetNode { node })
    }

    pub fn update_attribute(&self, node: NodeId, attribute: AttributeId) -> bool {
        self.execute(&Command::GetAttribute { node, attribute })
    }

    pub fn set_value(&self, node: NodeId, attribute: AttributeId, value: f64) -> bool {
        self.execute(&Command::SetValue {
            node,
            attribute,
            value,
        })
    }

    pub fn play_homeegram(&self, homeegram: HomeegramId) -> bool {
        self.execute(&Command::PlayHomeegram { homeegram })
    }

    // ── Reconnect loop ───────────────────────────────────────────────

    async fn drive(&self, stop: CancellationToken) -> Result<(), CoreError> {
        let inner = &self.inner;
        let config = &inner.config;
        let mut initial = true;

        while initial
            || (!stop.is_cancelled() && config.reconnect && self.retries() < config.max_retries)
        {
            initial = false;

            let retries = self.retries();
            if retries > 0 {
                let delay = reconnect_delay(retries, config.reconnect_interval);
                info!(
                    attempt = retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "waiting before reconnect"
                );
                inner.set_state(ConnectionState::Reconnecting { attempt: retries });
                tokio::select! {
                    biased;
                    () = stop.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
                inner.events.emit(HubEvent::Reconnecting { attempt: retries });
            }

            inner.set_state(ConnectionState::Authenticating);
            let token = tokio::select! {
                biased;
                () = stop.cancelled() => break,
                result = inner.tokens.access_token() => result,
            };
            let token = match token {
                Ok(token) => token,
                Err(e) => {
                    warn!(error = %e, "could not acquire access token");
                    inner.retries.fetch_add(1, Ordering::SeqCst);
                    inner.events.emit(HubEvent::Error {
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            self.open_socket(&token, &stop).await;
        }

        inner.set_state(ConnectionState::Closed);

        if stop.is_cancelled() {
            info!("session stopped");
            return Ok(());
        }

        let retries = self.retries();
        if retries >= config.max_retries {
            warn!(retries, "maximum reconnect attempts reached");
            inner.events.emit(HubEvent::MaxRetriesReached { retries });
            return Err(CoreError::MaxRetriesExceeded { retries });
        }

        info!("reconnect disabled, session ended");
        Ok(())
    }

    // ── Single connection ────────────────────────────────────────────

    /// Open the push channel and serve it until it closes.
    async fn open_socket(&self, token: &AccessToken, stop: &CancellationToken) {
        let inner = &self.inner;
        inner.set_state(ConnectionState::Connecting);

        let result = self.serve(token, stop).await;
        let error = match result {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "push channel failed");
                inner.events.emit(HubEvent::Error {
                    message: e.to_string(),
                });
                Some(e.to_string())
            }
        };

        inner.retries.fetch_add(1, Ordering::SeqCst);
        self.on_close(error);
    }

    async fn serve(&self, token: &AccessToken, stop: &CancellationToken) -> Result<(), CoreError> {
        let inner = &self.inner;
        let config = &inner.config;
        let url = websocket::connection_url(&config.host, config.port, token.secret())?;

        let connected = tokio::select! {
            biased;
            () = stop.cancelled() => return Ok(()),
            result = websocket::connect(&url, config.request_timeout) => result,
        };
        let stream = match connected {
            Ok(stream) => stream,
            Err(e) => {
                if e.is_auth_failure() {
                    debug!("access token refused, discarding cached token");
                    inner.tokens.invalidate().await;
                }
                return Err(e.into());
            }
        };

        // Commands queued for a previous connection are stale.
        let mut commands = inner.command_rx.lock().await;
        while commands.try_recv().is_ok() {}

        self.on_open();

        let (sink, stream) = stream.split();
        tokio::select! {
            result = self.receive_loop(stream) => result,
            result = self.send_loop(sink, &mut commands, stop) => result,
        }
    }

    fn on_open(&self) {
        let inner = &self.inner;
        info!("push channel open");

        inner.snapshot_ready.reset();
        inner.closed.reset();
        inner.connected.store(true, Ordering::SeqCst);

        let retries = inner.retries.swap(0, Ordering::SeqCst);
        inner.set_state(ConnectionState::Open);
        inner.events.emit(HubEvent::Connected { retries });

        inner.send(Command::GetAll.to_string());
    }

    fn on_close(&self, error: Option<String>) {
        let inner = &self.inner;
        let was_connected = inner.connected.swap(false, Ordering::SeqCst);
        inner.closed.open();

        if was_connected {
            info!(error = error.as_deref(), "push channel closed");
            inner.events.emit(HubEvent::Disconnected { error });
        }
    }

    async fn receive_loop(&self, mut stream: SplitStream<HubStream>) -> Result<(), CoreError> {
        let inner = &self.inner;

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Err(e) = inner.dispatcher.handle_text(text.as_str()) {
                        warn!(error = %e, "dropping inbound message");
                        inner.events.emit(HubEvent::Error {
                            message: e.to_string(),
                        });
                    }
                }
                Ok(Message::Close(frame)) => {
                    return match frame {
                        Some(cf) if !matches!(cf.code, CloseCode::Normal | CloseCode::Away) => {
                            Err(homee_api::Error::WebSocketClosed {
                                code: cf.code.into(),
                                reason: cf.reason.as_str().to_owned(),
                            }
                            .into())
                        }
                        _ => {
                            info!("hub closed the push channel");
                            Ok(())
                        }
                    };
                }
                Ok(_) => {}
                Err(e) => return Err(inner.socket_error(&e)),
            }
        }

        debug!("push channel stream ended");
        Ok(())
    }

    async fn send_loop(
        &self,
        mut sink: SplitSink<HubStream, Message>,
        commands: &mut mpsc::Receiver<String>,
        stop: &CancellationToken,
    ) -> Result<(), CoreError> {
        let inner = &self.inner;
        let mut ping = tokio::time::interval(inner.config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ping.tick().await;

        loop {
            tokio::select! {
                biased;
                () = stop.cancelled() => {
                    inner.set_state(ConnectionState::Closing);
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        debug!(error = %e, "close frame not sent");
                    }
                    return Ok(());
                }
                Some(command) = commands.recv() => {
                    if inner.connected.load(Ordering::SeqCst) && !stop.is_cancelled() {
                        trace!(%command, "sending command");
                        sink.send(Message::text(command))
                            .await
                            .map_err(|e| inner.socket_error(&e))?;
                    }
                }
                _ = ping.tick() => {
                    trace!("ping");
                    sink.send(Message::Ping(Default::default()))
                        .await
                        .map_err(|e| inner.socket_error(&e))?;
                }
            }
        }
    }
}

impl SessionInner {
    fn arm_stop(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.stop.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }

    fn stop_token(&self) -> CancellationToken {
        self.stop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn send(&self, command: String) -> bool {
        if !self.connected.load(Ordering::SeqCst) || self.stop_token().is_cancelled() {
            debug!(%command, "not connected, dropping command");
            return false;
        }
        match self.command_tx.try_send(command) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "command queue full, dropping command");
                false
            }
        }
    }

    fn socket_error(&self, err: &tokio_tungstenite::tungstenite::Error) -> CoreError {
        CoreError::ConnectionFailed {
            host: self.config.host.clone(),
            reason: err.to_string(),
        }
    }
}

/// Linear backoff: `retries` times the base interval.
pub fn reconnect_delay(retries: u32, interval: Duration) -> Duration {
    interval.saturating_mul(retries)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_linear() {
        let interval = Duration::from_secs(5);
        assert_eq!(reconnect_delay(0, interval), Duration::ZERO);
        assert_eq!(reconnect_delay(1, interval), Duration::from_secs(5));
        assert_eq!(reconnect_delay(4, interval), Duration::from_secs(20));
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(reconnect_delay(u32::MAX, Duration::MAX), Duration::MAX);
    }

    #[tokio::test]
    async fn send_is_dropped_while_disconnected() {
        let config = HubConfig::new("127.0.0.1", "homee", "secret".to_string());
        let session = Session::new(config).unwrap();

        assert_eq!(session.state(), ConnectionState::Idle);
        assert!(!session.send("GET:all"));
        assert!(!session.request_all());
    }

    #[test]
    fn state_renders_snake_case() {
        assert_eq!(ConnectionState::Authenticating.to_string(), "authenticating");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = HubConfig::new("hub", "homee", "secret".to_string());
        config.ping_interval = Duration::ZERO;
        assert!(matches!(Session::new(config), Err(CoreError::Config { .. })));
    }
}
