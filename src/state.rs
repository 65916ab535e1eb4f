//! Connection state machine.
//!
//! A session is always in exactly one [`ConnectionState`]. State changes
//! happen only through the session's internal transition function, and every
//! transition is broadcast synchronously to connection subscribers (see
//! [`crate::events`]).
//!
//! # Transitions
//!
//! ```text
//! Disconnected ─► Connecting ─► Connected ─► Disconnected ─► Reconnecting
//!                     ▲   │          │            ▲               │
//!                     │   ▼          ▼            │               │
//!                     │  Error ──────┴────────────┘               │
//!                     └───────────────────────────────────────────┘
//! ```
//!
//! Reconnection is close-driven: only the unexpected close of a previously
//! healthy (`Connected`) session enters `Reconnecting`, and it does so via
//! `Disconnected`. A failed dial and a mid-session transport error both go
//! through `Error` and settle in `Disconnected`. `disconnect()` settles the
//! session in `Disconnected` from any state, including mid-dial.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// The lifecycle state of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket is open and no attempt is in progress.
    Disconnected,
    /// A dial is in progress.
    Connecting,
    /// The socket is open and the session is live.
    Connected,
    /// Waiting out the fixed delay before the next dial attempt.
    Reconnecting,
    /// A transport error was observed; settles into `Disconnected`.
    Error,
}

impl ConnectionState {
    /// Returns `true` if the socket is open and sends will be written.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if a dial or retry is underway.
    #[inline]
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Reconnecting => "RECONNECTING",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_names() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "DISCONNECTED");
        assert_eq!(ConnectionState::Connecting.to_string(), "CONNECTING");
        assert_eq!(ConnectionState::Connected.to_string(), "CONNECTED");
        assert_eq!(ConnectionState::Reconnecting.to_string(), "RECONNECTING");
        assert_eq!(ConnectionState::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_is_open() {
        assert!(ConnectionState::Connected.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::Disconnected.is_open());
        assert!(!ConnectionState::Reconnecting.is_open());
        assert!(!ConnectionState::Error.is_open());
    }

    #[test]
    fn test_is_transient() {
        assert!(ConnectionState::Connecting.is_transient());
        assert!(ConnectionState::Reconnecting.is_transient());
        assert!(!ConnectionState::Connected.is_transient());
        assert!(!ConnectionState::Error.is_transient());
    }
}
