//! Chat session lifecycle and event loop.
//!
//! [`ChatClient`] is a cloneable handle over one logical session. The handle
//! never blocks: every operation either reads shared state or pushes a frame
//! onto an unbounded channel consumed by a background driver task, and
//! outcomes surface through the event fan-out registry rather than return
//! values.
//!
//! # Driver Task
//!
//! `connect()` spawns one driver task that owns the socket for the whole
//! session, including retries:
//!
//! ```text
//! Connecting ──dial──► Connected ──► socket loop ──unexpected close──┐
//!     ▲                              (recv / commands / heartbeat)   │
//!     │                                                              ▼
//!     └──── sleep(reconnect_interval) ◄── Reconnecting ◄── Disconnected
//! ```
//!
//! The retry budget is a fixed number of evenly spaced attempts. A
//! successful open resets it; exhausting it parks the session in
//! `Disconnected` until `connect()` is called again. Only the close of a
//! previously healthy session starts a retry run; a failed first dial and a
//! mid-session transport error both stop the driver.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::events::{EventRegistry, Subscription};
use crate::protocol::{Envelope, Frame, default_message_key};
use crate::state::ConnectionState;

use super::connector::{Connector, Transport, WsConnector};

// ============================================================================
// Constants
// ============================================================================

/// Default page size for history requests.
const DEFAULT_HISTORY_LIMIT: u64 = 500;

// ============================================================================
// SendOptions
// ============================================================================

/// Options for [`ChatClient::send_message_with`].
///
/// All fields default to "unset": the room falls back to the current room,
/// the key to a generated `{room}_{millis}_{user}` key, and no `to` means
/// broadcast.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Target room; defaults to the current room.
    pub room: Option<String>,
    /// Direct-message target; `None` broadcasts to the room.
    pub to: Option<String>,
    /// Explicit message key; `None` generates one.
    pub key: Option<String>,
}

impl SendOptions {
    /// Creates empty options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets a specific room instead of the current one.
    #[inline]
    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Sends directly to one user instead of broadcasting.
    #[inline]
    #[must_use]
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    /// Supplies an explicit message key.
    #[inline]
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

// ============================================================================
// DriverCommand
// ============================================================================

/// Commands from the handle to the driver task.
enum DriverCommand {
    /// Write a frame to the socket.
    Frame(Frame),
    /// Close the socket and end the session.
    Disconnect,
}

/// Why the socket loop ended.
enum SocketOutcome {
    /// The remote end closed the connection.
    ///
    /// `healthy` is `false` when a transport error preceded the close; an
    /// error-tainted close does not start a retry run.
    RemoteClose {
        /// Whether the session was still in `Connected` when it closed.
        healthy: bool,
    },
    /// `disconnect()` was called (or the handle side went away).
    LocalClose,
}

/// Result of one cancellable dial attempt.
enum Dialed {
    /// The dial succeeded.
    Transport(Box<dyn Transport>),
    /// The dial or handshake failed.
    Failed(Error),
    /// `disconnect()` arrived while dialing; the attempt was abandoned.
    Cancelled,
}

/// Result of waiting out one reconnect delay.
#[derive(PartialEq)]
enum Wait {
    /// The delay elapsed; dial again.
    Elapsed,
    /// `disconnect()` arrived during the delay; stop retrying.
    Cancelled,
}

// ============================================================================
// ChatClient
// ============================================================================

/// Handle to one chat session.
///
/// Cloning is cheap and every clone controls the same session. All
/// operations are fire-and-forget; subscribe via [`ChatClient::on_message`],
/// [`ChatClient::on_connection`] and [`ChatClient::on_error`] to observe
/// outcomes.
///
/// Dropping the last handle does not close the socket; call
/// [`ChatClient::disconnect`] to end the session.
///
/// # Example
///
/// ```no_run
/// use quarks_chat::{ChatClient, ChatConfig};
///
/// #[tokio::main]
/// async fn main() {
///     let client = ChatClient::new(ChatConfig::new("wss://chat.example.com/ws", "alice"));
///
///     let _sub = client.on_message(|envelope| {
///         if let Some(text) = envelope.content() {
///             println!("<{}> {}", envelope.from.as_deref().unwrap_or("?"), text);
///         }
///     });
///
///     client.connect();
///     client.send_message("hello, room");
/// }
/// ```
pub struct ChatClient {
    /// Shared session state.
    inner: Arc<ClientInner>,
}

impl Clone for ChatClient {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Shared state behind every [`ChatClient`] clone.
struct ClientInner {
    /// Immutable session configuration.
    config: ChatConfig,
    /// Dials a fresh transport per attempt.
    connector: Arc<dyn Connector>,
    /// Current connection state; mutated only via `transition`.
    state: Mutex<ConnectionState>,
    /// Last-joined room; targets sends and history requests.
    current_room: Mutex<String>,
    /// Fan-out of messages, state changes and errors.
    registry: EventRegistry,
    /// Command channel to the active driver task, if any.
    driver_tx: Mutex<Option<mpsc::UnboundedSender<DriverCommand>>>,
    /// Whether a driver task currently owns the session.
    driver_active: AtomicBool,
}

// ============================================================================
// ChatClient - Construction
// ============================================================================

impl ChatClient {
    /// Creates a client that dials real WebSocket connections.
    #[must_use]
    pub fn new(config: ChatConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Creates a client over a custom [`Connector`].
    ///
    /// Useful for alternative transports and for tests.
    #[must_use]
    pub fn with_connector(config: ChatConfig, connector: Arc<dyn Connector>) -> Self {
        let current_room = config.default_room.clone();
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                state: Mutex::new(ConnectionState::Disconnected),
                current_room: Mutex::new(current_room),
                registry: EventRegistry::new(),
                driver_tx: Mutex::new(None),
                driver_active: AtomicBool::new(false),
            }),
        }
    }
}

// ============================================================================
// ChatClient - Connection Management
// ============================================================================

impl ChatClient {
    /// Opens the session.
    ///
    /// No-op while a session driver is already active (connected or mid
    /// retry). Must be called from within a tokio runtime; the driver task
    /// is spawned onto it.
    pub fn connect(&self) {
        if self
            .inner
            .driver_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("connect ignored: session already active");
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.driver_tx.lock() = Some(tx);
        self.inner.transition(ConnectionState::Connecting);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(run_driver(inner, rx));
    }

    /// Closes the session.
    ///
    /// Transitions to `Disconnected`, closes the socket and stops the
    /// heartbeat. A reconnect delay in progress is cancelled: after
    /// `disconnect()` the session stays down until `connect()` is called
    /// again. Idempotent.
    pub fn disconnect(&self) {
        self.inner.transition(ConnectionState::Disconnected);
        if let Some(tx) = self.inner.driver_tx.lock().as_ref() {
            let _ = tx.send(DriverCommand::Disconnect);
        }
    }

    /// Returns the current connection state. Never blocks.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// Returns the current room.
    ///
    /// Last-joined wins; this is a single slot, not multi-room membership
    /// tracking (see [`crate::rooms::RoomTracker`] for that).
    #[inline]
    #[must_use]
    pub fn current_room(&self) -> String {
        self.inner.current_room.lock().clone()
    }

    /// Returns the session configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }
}

// ============================================================================
// ChatClient - Rooms & Presence
// ============================================================================

impl ChatClient {
    /// Joins a room, announcing the join and eventual leave to its members.
    ///
    /// Updates the current room immediately (even while disconnected, in
    /// which case the join frame itself is dropped).
    pub fn join_room(&self, room: impl Into<String>) {
        self.join_room_with_notify(room, true, true);
    }

    /// Joins a room with explicit notify hints.
    ///
    /// The flags control whether other members are told about this join and
    /// the eventual leave; they are interpreted server-side.
    pub fn join_room_with_notify(
        &self,
        room: impl Into<String>,
        notify_join: bool,
        notify_leave: bool,
    ) {
        let room = room.into();
        *self.inner.current_room.lock() = room.clone();
        self.inner
            .enqueue(Frame::join(room, notify_join, notify_leave));
    }

    /// Leaves a room.
    ///
    /// The current room is intentionally left untouched: sends keep
    /// targeting the last-joined room until the next join.
    pub fn leave_room(&self, room: impl Into<String>) {
        self.inner.enqueue(Frame::leave(room.into()));
    }

    /// Requests the full member list of the current room.
    ///
    /// The reply arrives asynchronously as an envelope carrying
    /// `replyuserlist`.
    pub fn list_users(&self) {
        let room = self.current_room();
        self.list_users_in(room);
    }

    /// Requests the full member list of a specific room.
    pub fn list_users_in(&self, room: impl Into<String>) {
        self.inner.enqueue(Frame::user_list(room.into()));
    }
}

// ============================================================================
// ChatClient - Messaging
// ============================================================================

impl ChatClient {
    /// Broadcasts a message to the current room.
    ///
    /// Delivery is at-most-once: the frame is dropped silently when the
    /// socket is not open, and no ack is awaited.
    pub fn send_message(&self, content: impl Into<String>) {
        self.send_message_with(content, SendOptions::new());
    }

    /// Sends a message with explicit room, target or key.
    pub fn send_message_with(&self, content: impl Into<String>, options: SendOptions) {
        let room = options
            .room
            .unwrap_or_else(|| self.inner.current_room.lock().clone());
        let key = options
            .key
            .unwrap_or_else(|| default_message_key(&room, &self.inner.config.user_id));

        let frame = match options.to {
            Some(to) => Frame::send_to(room, content.into(), to, key),
            None => Frame::send(room, content.into(), key),
        };
        self.inner.enqueue(frame);
    }

    /// Requests the last 500 messages of the current room.
    ///
    /// The reply arrives asynchronously as an envelope carrying
    /// `replygetkeys`.
    pub fn message_history(&self) {
        let room = self.current_room();
        self.message_history_with(room, DEFAULT_HISTORY_LIMIT, 0);
    }

    /// Requests message history for a room with explicit paging.
    pub fn message_history_with(&self, room: impl Into<String>, limit: u64, skip: u64) {
        self.inner
            .enqueue(Frame::get_keys(&room.into(), skip, limit));
    }
}

// ============================================================================
// ChatClient - Subscriptions
// ============================================================================

impl ChatClient {
    /// Registers a handler for all parsed inbound envelopes.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.inner.registry.on_message(handler)
    }

    /// Registers a handler for every connection-state transition.
    pub fn on_connection<F>(&self, handler: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.inner.registry.on_connection(handler)
    }

    /// Registers a handler for transport errors.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.inner.registry.on_error(handler)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.inner.config.endpoint)
            .field("user_id", &self.inner.config.user_id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ClientInner
// ============================================================================

impl ClientInner {
    /// Moves to a new connection state and notifies subscribers.
    ///
    /// The only place state is written.
    fn transition(&self, next: ConnectionState) {
        *self.state.lock() = next;
        debug!(state = %next, "connection state");
        self.registry.notify_connection(next);
    }

    /// Queues a frame for the driver, or drops it when the socket is not
    /// open. Never fails, never blocks.
    fn enqueue(&self, frame: Frame) {
        if !self.state.lock().is_open() {
            if self.config.debug {
                debug!(?frame, "frame dropped: connection not open");
            }
            return;
        }

        let guard = self.driver_tx.lock();
        match guard.as_ref() {
            Some(tx) => {
                if tx.send(DriverCommand::Frame(frame)).is_err() {
                    debug!("frame dropped: session driver gone");
                }
            }
            None => debug!("frame dropped: no active session"),
        }
    }

    /// Builds the connection URL: `{endpoint}?_id={user_id}`.
    fn connection_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.config.endpoint)
            .map_err(|e| Error::invalid_endpoint(&self.config.endpoint, e.to_string()))?;
        url.query_pairs_mut().append_pair("_id", &self.config.user_id);
        Ok(url)
    }

    /// Dials one fresh transport.
    async fn dial(&self) -> Result<Box<dyn Transport>> {
        let url = self.connection_url()?;
        self.connector.connect(url.as_str()).await
    }

    /// Parses an inbound frame and fans it out; malformed frames are
    /// logged and dropped without notifying anyone.
    fn dispatch_inbound(&self, text: &str) {
        match Envelope::parse(text) {
            Ok(envelope) => {
                if self.config.debug {
                    trace!(frame = %text, "frame in");
                }
                self.registry.notify_message(&envelope);
            }
            Err(e) => debug!(error = %e, "malformed inbound frame dropped"),
        }
    }

    /// Serializes and writes one frame; write failures drop the frame.
    async fn write_frame(&self, transport: &mut Box<dyn Transport>, frame: &Frame) {
        match serde_json::to_string(frame) {
            Ok(text) => {
                if self.config.debug {
                    trace!(frame = %text, "frame out");
                }
                if let Err(e) = transport.send(text).await {
                    debug!(error = %e, "outbound write failed; frame dropped");
                }
            }
            Err(e) => debug!(error = %e, "frame serialization failed; frame dropped"),
        }
    }

    /// Joins the configured default room right after open.
    ///
    /// Overwrites the current room: joins issued before connect only update
    /// the slot, never the auto-join target.
    async fn auto_join(&self, transport: &mut Box<dyn Transport>) {
        let room = self.config.default_room.clone();
        *self.current_room.lock() = room.clone();
        self.write_frame(transport, &Frame::join(room, true, true))
            .await;
    }
}

// ============================================================================
// Driver Task
// ============================================================================

/// Owns the socket for one session, dial through retries to shutdown.
async fn run_driver(inner: Arc<ClientInner>, mut rx: mpsc::UnboundedReceiver<DriverCommand>) {
    let mut attempts: u32 = 0;
    let mut retry_run = false;

    // State is `Connecting` on entry (set by `connect()` and by the retry
    // arm below).
    loop {
        match dial_or_cancel(&inner, &mut rx).await {
            Dialed::Cancelled => {
                // disconnect() already transitioned; drop the in-flight
                // dial and stop.
                break;
            }
            Dialed::Transport(mut transport) => {
                attempts = 0;
                retry_run = false;
                inner.transition(ConnectionState::Connected);
                inner.auto_join(&mut transport).await;
                info!(room = %inner.config.default_room, "session connected");

                match drive_socket(&inner, &mut transport, &mut rx).await {
                    SocketOutcome::LocalClose => {
                        // disconnect() normally transitioned before the
                        // command arrived; cover one that raced the dial
                        // resolving.
                        if *inner.state.lock() != ConnectionState::Disconnected {
                            inner.transition(ConnectionState::Disconnected);
                        }
                        break;
                    }
                    SocketOutcome::RemoteClose { healthy } => {
                        inner.transition(ConnectionState::Disconnected);
                        if !healthy {
                            // Error-tainted close: reconnection is reserved
                            // for closes of a healthy session.
                            break;
                        }
                    }
                }
            }
            Dialed::Failed(e) => {
                inner.transition(ConnectionState::Error);
                inner.registry.notify_error(&e);
                inner.transition(ConnectionState::Disconnected);
                if !retry_run {
                    // A failed first dial is not retried; the caller must
                    // call connect() again.
                    break;
                }
            }
        }

        if !inner.config.auto_reconnect {
            break;
        }
        if attempts >= inner.config.max_reconnect_attempts {
            warn!(attempts, "retry budget exhausted; session stays down");
            break;
        }

        attempts += 1;
        retry_run = true;
        inner.transition(ConnectionState::Reconnecting);
        debug!(
            attempt = attempts,
            max = inner.config.max_reconnect_attempts,
            "reconnect scheduled"
        );

        if wait_retry_interval(&inner, &mut rx).await == Wait::Cancelled {
            break;
        }
        inner.transition(ConnectionState::Connecting);
    }

    *inner.driver_tx.lock() = None;
    inner.driver_active.store(false, Ordering::SeqCst);
    debug!("session driver terminated");
}

/// Socket event loop: inbound frames, handle commands, heartbeat ticks.
async fn drive_socket(
    inner: &ClientInner,
    transport: &mut Box<dyn Transport>,
    rx: &mut mpsc::UnboundedReceiver<DriverCommand>,
) -> SocketOutcome {
    let period = inner.config.heartbeat_interval;
    let mut heartbeat = interval_at(Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = transport.recv() => match frame {
                Some(Ok(text)) => inner.dispatch_inbound(&text),

                Some(Err(e)) => {
                    inner.transition(ConnectionState::Error);
                    inner.registry.notify_error(&e);
                    return SocketOutcome::RemoteClose { healthy: false };
                }

                None => {
                    debug!("socket closed by remote");
                    return SocketOutcome::RemoteClose { healthy: true };
                }
            },

            command = rx.recv() => match command {
                Some(DriverCommand::Frame(frame)) => {
                    inner.write_frame(transport, &frame).await;
                }

                Some(DriverCommand::Disconnect) | None => {
                    debug!("local disconnect; closing socket");
                    let _ = transport.close().await;
                    return SocketOutcome::LocalClose;
                }
            },

            _ = heartbeat.tick() => {
                inner.write_frame(transport, &Frame::ping()).await;
            }
        }
    }
}

/// Dials one transport, abandoning the attempt if `disconnect()` arrives
/// while the dial is in flight.
async fn dial_or_cancel(
    inner: &ClientInner,
    rx: &mut mpsc::UnboundedReceiver<DriverCommand>,
) -> Dialed {
    let dial = inner.dial();
    tokio::pin!(dial);

    loop {
        tokio::select! {
            result = &mut dial => return match result {
                Ok(transport) => Dialed::Transport(transport),
                Err(e) => Dialed::Failed(e),
            },

            command = rx.recv() => match command {
                Some(DriverCommand::Disconnect) | None => {
                    debug!("dial cancelled by disconnect");
                    return Dialed::Cancelled;
                }
                // Not connected: frames queued during the dial are dropped.
                Some(DriverCommand::Frame(_)) => {}
            }
        }
    }
}

/// Sleeps out one reconnect delay, cancellable by `disconnect()`.
async fn wait_retry_interval(
    inner: &ClientInner,
    rx: &mut mpsc::UnboundedReceiver<DriverCommand>,
) -> Wait {
    let delay = sleep(inner.config.reconnect_interval);
    tokio::pin!(delay);

    loop {
        tokio::select! {
            () = &mut delay => return Wait::Elapsed,

            command = rx.recv() => match command {
                Some(DriverCommand::Disconnect) | None => {
                    debug!("reconnect cancelled by disconnect");
                    return Wait::Cancelled;
                }
                // Not connected: frames queued during the delay are dropped.
                Some(DriverCommand::Frame(_)) => {}
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
