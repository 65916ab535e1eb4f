//! WebSocket transport layer.
//!
//! Two layers:
//!
//! | Module | Role |
//! |--------|------|
//! | [`connector`] | [`Transport`]/[`Connector`] traits and the tokio-tungstenite implementation |
//! | [`session`] | [`ChatClient`] handle and the background session driver |
//!
//! The [`Connector`] seam exists so the session driver can dial a fresh
//! transport per reconnect attempt, and so tests can substitute scripted
//! transports for a live server.

pub mod connector;
pub mod session;

pub use connector::{Connector, Transport, WsConnector};
pub use session::{ChatClient, SendOptions};
