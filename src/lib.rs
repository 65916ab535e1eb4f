//! Quarks Chat - Resilient WebSocket chat client library.
//!
//! This library provides a non-blocking client for JSON-over-WebSocket chat
//! servers with rooms, presence, message history and automatic reconnection.
//!
//! # Architecture
//!
//! The client follows a handle-and-driver model:
//!
//! - **Handle ([`ChatClient`])**: Cheap to clone, never blocks; operations
//!   enqueue frames or read shared state
//! - **Driver (background task)**: Owns the socket, runs the heartbeat and
//!   the bounded reconnect loop
//!
//! Key design principles:
//!
//! - All operations are fire-and-forget; outcomes surface via subscriptions
//! - Nothing in the public API panics or returns transport errors inline
//! - Frames sent while the socket is closed are dropped silently
//! - Handlers run synchronously, in registration order, on a snapshot
//!
//! # Quick Start
//!
//! ```no_run
//! use quarks_chat::{ChatClient, ChatConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ChatConfig::new("wss://chat.example.com/ws", "alice")
//!         .with_default_room("lobby");
//!     let client = ChatClient::new(config);
//!
//!     let _messages = client.on_message(|envelope| {
//!         if let Some(text) = envelope.content() {
//!             println!("<{}> {}", envelope.from.as_deref().unwrap_or("?"), text);
//!         }
//!     });
//!     let _states = client.on_connection(|state| println!("connection: {state}"));
//!
//!     client.connect();
//!     client.send_message("hello");
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Session configuration: [`ChatConfig`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | Subscription registry and fan-out |
//! | [`protocol`] | Wire frames and inbound envelopes |
//! | [`rooms`] | Multi-room membership tracking |
//! | [`state`] | Connection state machine |
//! | [`transport`] | Transport traits, session handle and driver |

// ============================================================================
// Modules
// ============================================================================

/// Session configuration.
///
/// Use [`ChatConfig::new`] plus `with_*` builders.
pub mod config;

/// Error types and result aliases.
///
/// Errors never cross the public API as return values; they arrive through
/// [`ChatClient::on_error`].
pub mod error;

/// Subscription registry and synchronous fan-out.
pub mod events;

/// Wire protocol: outbound [`Frame`]s and inbound [`Envelope`]s.
pub mod protocol;

/// Multi-room membership tracking on top of the single-room client.
pub mod rooms;

/// Connection state machine.
pub mod state;

/// WebSocket transport layer: [`Connector`]/[`Transport`] traits, the
/// [`ChatClient`] handle and its background session driver.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::ChatConfig;

// Error types
pub use error::{Error, Result};

// Events
pub use events::{EventRegistry, Subscription};

// Protocol types
pub use protocol::{Envelope, Frame, HistoryEntry, default_message_key, message_key};

// Rooms
pub use rooms::RoomTracker;

// State
pub use state::ConnectionState;

// Transport types
pub use transport::{ChatClient, Connector, SendOptions, Transport, WsConnector};
