//! Connection lifecycle for the live notification stream.
//!
//! [`NotificationTransport`] owns the single logical connection to the
//! backend: it connects (idempotently), fans inbound events out to
//! registered callbacks, and recovers from drops through two independent
//! triggers (an error-driven reconnect loop and a periodic health check),
//! both funnelled through the same bounded attempt budget.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use ladle_core::{AdminConfig, NotificationEvent};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::client::{WsClient, WsConnection};
use crate::processor::process_messages;
use crate::reconnect::ReconnectPolicy;
use crate::registry::{CallbackId, CallbackRegistry};

/// Health of the logical connection, published through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and no handshake in flight.
    Disconnected,
    /// A handshake is in flight.
    Connecting,
    /// The stream is live and delivering events.
    Connected,
}

/// Tunable parameters for the transport.
///
/// Every timing knob is public so tests can run with millisecond values.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket base URL, e.g. `ws://host:8080`.
    pub ws_url: String,
    /// Environment variable holding the bearer credential, read at every
    /// connect so a rotated token is picked up. Absence fails the connect
    /// fast, with nothing scheduled.
    pub auth_token_env: String,
    /// Bound on how long one `connect()` call waits for an established
    /// connection (default: 5 s).
    pub connect_timeout: Duration,
    /// Pause between handshake tries inside the connect window
    /// (default: 250 ms).
    pub connect_retry_interval: Duration,
    /// Automatic reconnection policy (default: 2 s fixed delay, 10 attempts).
    pub reconnect: ReconnectPolicy,
    /// Interval of the background health check (default: 30 s).
    pub health_check_interval: Duration,
}

impl TransportConfig {
    /// Config with production defaults for the given endpoint.
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            auth_token_env: "LADLE_AUTH_TOKEN".into(),
            connect_timeout: Duration::from_secs(5),
            connect_retry_interval: Duration::from_millis(250),
            reconnect: ReconnectPolicy::default(),
            health_check_interval: Duration::from_secs(30),
        }
    }

    /// Derive the transport config from the loaded admin configuration.
    pub fn from_admin(config: &AdminConfig) -> Self {
        let mut this = Self::new(config.ws_url.clone());
        this.auth_token_env = config.auth_token_env.clone();
        this
    }
}

/// One logical live connection to the backend notification stream.
///
/// Created once at application startup via [`NotificationTransport::new`];
/// the returned `Arc` is cloned into every component that needs live
/// updates. The connection object and the callback list are owned here and
/// mutated only through these methods.
pub struct NotificationTransport {
    config: TransportConfig,
    client: WsClient,
    registry: CallbackRegistry,
    state_tx: watch::Sender<ConnectionState>,
    /// Automatic attempts made since the last reset (manual connect,
    /// successful connection, or disconnect).
    auto_attempts: AtomicU32,
    /// Serializes concurrent connect callers so the dual reconnect
    /// triggers cannot open two sockets.
    connect_lock: Mutex<()>,
    /// Cancellation token of the current connection generation; rotated
    /// (and the old one cancelled) whenever a new connection replaces it.
    conn_cancel: StdMutex<CancellationToken>,
}

impl NotificationTransport {
    /// Create a disconnected transport. Call [`connect`](Self::connect) to
    /// establish the stream.
    pub fn new(config: TransportConfig) -> Arc<Self> {
        let client = WsClient::new(config.ws_url.clone());
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Arc::new(Self {
            config,
            client,
            registry: CallbackRegistry::new(),
            state_tx,
            auto_attempts: AtomicU32::new(0),
            connect_lock: Mutex::new(()),
            conn_cancel: StdMutex::new(CancellationToken::new()),
        })
    }

    /// Establish the connection, waiting up to the configured timeout.
    ///
    /// Idempotent: returns `true` immediately when already connected.
    /// Resets the automatic-attempt budget, so a caller can always recover
    /// an exhausted transport by connecting manually. Returns `false` when
    /// the credential is missing or no connection could be established
    /// inside the window; callers should treat that as "not yet ready",
    /// the health check keeps trying.
    pub async fn connect(self: &Arc<Self>) -> bool {
        self.auto_attempts.store(0, Ordering::SeqCst);
        self.connect_inner().await
    }

    /// Terminate the connection and cancel any pending reconnect.
    ///
    /// Idempotent; also resets the automatic-attempt budget.
    pub fn disconnect(&self) {
        self.rotate_conn_cancel();
        self.auto_attempts.store(0, Ordering::SeqCst);
        let previous = self.set_state(ConnectionState::Disconnected);
        if previous != ConnectionState::Disconnected {
            tracing::info!("Notification transport disconnected");
        }
    }

    /// Add a delivery callback; invoked for every inbound event, after all
    /// callbacks registered earlier.
    pub fn register_callback(
        &self,
        callback: impl Fn(NotificationEvent) + Send + Sync + 'static,
    ) -> CallbackId {
        self.registry.register(callback)
    }

    /// Remove a delivery callback. Unknown ids are a no-op.
    pub fn unregister_callback(&self, id: CallbackId) {
        self.registry.unregister(id);
    }

    /// Number of registered delivery callbacks.
    pub fn callback_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the stream is currently live.
    pub fn is_connected(&self) -> bool {
        self.current_state() == ConnectionState::Connected
    }

    /// Current connection state.
    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch the connection state; useful to await readiness instead of
    /// polling [`is_connected`](Self::is_connected).
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    // ---- private helpers ----

    /// Shared connect path for the manual, error-driven, and health-check
    /// triggers. Does not touch the attempt budget.
    async fn connect_inner(self: &Arc<Self>) -> bool {
        if self.is_connected() {
            return true;
        }
        let _guard = self.connect_lock.lock().await;
        if self.is_connected() {
            // A concurrent trigger won the race while we waited.
            return true;
        }

        let Some(token) = self.auth_token() else {
            tracing::warn!(
                var = %self.config.auth_token_env,
                "Auth credential missing; cannot open notification stream",
            );
            return false;
        };

        // Tear down the previous connection generation (a stale reader or
        // its reconnect loop).
        let cancel = self.rotate_conn_cancel();

        self.set_state(ConnectionState::Connecting);
        let deadline = Instant::now() + self.config.connect_timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::warn!(
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "Timed out waiting for the notification stream",
                );
                self.set_state(ConnectionState::Disconnected);
                return false;
            }

            match tokio::time::timeout(remaining, self.client.connect(&token)).await {
                Ok(Ok(conn)) => {
                    self.auto_attempts.store(0, Ordering::SeqCst);
                    self.set_state(ConnectionState::Connected);
                    self.spawn_connection_task(conn, cancel);
                    return true;
                }
                Ok(Err(e)) => {
                    tracing::debug!(
                        error = %e,
                        "Handshake failed; retrying within the connect window",
                    );
                    let pause = self
                        .config
                        .connect_retry_interval
                        .min(deadline.saturating_duration_since(Instant::now()));
                    tokio::time::sleep(pause).await;
                }
                Err(_) => {
                    tracing::warn!(
                        timeout_ms = self.config.connect_timeout.as_millis() as u64,
                        "Timed out waiting for the notification stream",
                    );
                    self.set_state(ConnectionState::Disconnected);
                    return false;
                }
            }
        }
    }

    /// Spawn the long-lived task that processes frames and automatically
    /// reconnects when the stream drops.
    fn spawn_connection_task(self: &Arc<Self>, conn: WsConnection, cancel: CancellationToken) {
        let transport = Arc::clone(self);
        tokio::spawn(async move {
            tracing::debug!(session_id = %conn.session_id, "Connection task started");
            transport.run_connection(conn, cancel).await;
            tracing::debug!("Connection task exited");
        });
    }

    /// Core connection loop: process frames -> reconnect -> repeat.
    ///
    /// Runs until the cancellation token is triggered or the reconnect
    /// budget is exhausted.
    async fn run_connection(self: Arc<Self>, conn: WsConnection, cancel: CancellationToken) {
        let mut ws_stream = conn.ws_stream;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = process_messages(&mut ws_stream, &self.registry) => {}
            }
            if cancel.is_cancelled() {
                return;
            }

            self.set_state(ConnectionState::Disconnected);
            tracing::info!("Notification stream dropped; starting automatic reconnect");

            match self.reconnect_loop(&cancel).await {
                Some(new_conn) => ws_stream = new_conn.ws_stream,
                None => return,
            }
        }
    }

    /// Error-driven reconnection: fixed delay per attempt, bounded budget.
    ///
    /// Returns `Some(connection)` once an attempt succeeds, or `None` when
    /// cancelled or the budget is spent.
    async fn reconnect_loop(&self, cancel: &CancellationToken) -> Option<WsConnection> {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(self.config.reconnect.delay) => {}
            }

            let Some(attempt) = self.claim_auto_attempt() else {
                tracing::warn!(
                    max_attempts = self.config.reconnect.max_attempts,
                    "Reconnect attempts exhausted; waiting for a manual connect",
                );
                return None;
            };

            let Some(token) = self.auth_token() else {
                tracing::warn!(attempt, "Auth credential missing; reconnect attempt skipped");
                continue;
            };

            tracing::info!(
                attempt,
                delay_ms = self.config.reconnect.delay.as_millis() as u64,
                "Reconnecting to notification stream",
            );
            self.set_state(ConnectionState::Connecting);

            match tokio::time::timeout(self.config.connect_timeout, self.client.connect(&token))
                .await
            {
                Ok(Ok(conn)) => {
                    if cancel.is_cancelled() {
                        // A manual connect replaced this generation mid-handshake.
                        return None;
                    }
                    self.auto_attempts.store(0, Ordering::SeqCst);
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(attempt, "Reconnected to notification stream");
                    return Some(conn);
                }
                Ok(Err(e)) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                }
                Err(_) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::warn!(attempt, "Reconnect attempt timed out");
                }
            }
        }
    }

    /// Consume one unit of the automatic-attempt budget.
    ///
    /// Returns the 1-based attempt number, or `None` once the budget is
    /// spent (no automatic attempt may follow until a reset).
    fn claim_auto_attempt(&self) -> Option<u32> {
        self.auto_attempts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |attempts| {
                self.config
                    .reconnect
                    .next_attempt(attempts)
                    .map(|_| attempts + 1)
            })
            .ok()
            .map(|previous| previous + 1)
    }

    /// Read the bearer credential from the environment.
    fn auth_token(&self) -> Option<String> {
        std::env::var(&self.config.auth_token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }

    /// Replace the connection-generation token, cancelling the old one,
    /// and return the fresh token.
    fn rotate_conn_cancel(&self) -> CancellationToken {
        let mut guard = match self.conn_cancel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let old = std::mem::replace(&mut *guard, CancellationToken::new());
        old.cancel();
        guard.clone()
    }

    fn set_state(&self, state: ConnectionState) -> ConnectionState {
        self.state_tx.send_replace(state)
    }
}

/// Spawn the background health check for the lifetime of the process.
///
/// Every tick, if the transport believes itself disconnected, one unit of
/// the automatic-attempt budget is claimed and a reconnect is tried. This
/// is the second line of defense against silently-dropped connections,
/// independent of the error-driven reconnect loop; both stop once the
/// budget is spent, until a manual connect resets it.
pub fn start_health_check(transport: Arc<NotificationTransport>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(transport.config.health_check_interval);
        // The first tick of `interval` completes immediately; skip it so
        // startup wiring gets a full interval before the first probe.
        interval.tick().await;

        loop {
            interval.tick().await;

            if transport.current_state() != ConnectionState::Disconnected {
                continue;
            }

            let Some(attempt) = transport.claim_auto_attempt() else {
                tracing::debug!(
                    "Health check: reconnect budget exhausted, waiting for a manual connect",
                );
                continue;
            };

            tracing::info!(attempt, "Health check reconnecting notification transport");
            if !transport.connect_inner().await {
                tracing::warn!(attempt, "Health check reconnect failed");
            }
        }
    })
}
