//! Wire protocol message types.
//!
//! The chat protocol is JSON over a single WebSocket. Requests and responses
//! are asymmetric: the client writes one of a handful of exact frame shapes,
//! and the server replies (or pushes) loosely shaped objects whose fields are
//! all optional.
//!
//! | Direction | Type | Purpose |
//! |-----------|------|---------|
//! | Outbound | [`Frame`] | Join/leave, sends, list and history requests, pings |
//! | Inbound | [`Envelope`] | Messages, presence notices, replies, acks |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Outbound frame shapes and message-key generation |
//! | `envelope` | Inbound envelope with all-optional fields |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound frame shapes.
pub mod frame;

/// Inbound envelope parsing.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, HistoryEntry};
pub use frame::{Frame, default_message_key, message_key};
