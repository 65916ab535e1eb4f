//! Session configuration.
//!
//! [`ChatConfig`] is immutable once handed to the client; every knob has a
//! default matching the production deployment, so only the endpoint and the
//! user identifier are required.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use quarks_chat::ChatConfig;
//!
//! let config = ChatConfig::new("wss://chat.example.com/ws", "user-42")
//!     .with_default_room("lobby")
//!     .with_reconnect_interval(Duration::from_secs(2))
//!     .with_max_reconnect_attempts(3);
//!
//! assert_eq!(config.default_room, "lobby");
//! assert!(config.auto_reconnect);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Room joined automatically after every successful open.
const DEFAULT_ROOM: &str = "skyharvest";

/// Cap on consecutive reconnect attempts.
const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between reconnect attempts.
const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Period between keep-alive pings.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// ChatConfig
// ============================================================================

/// Configuration for a chat session.
///
/// Constructed once and never mutated afterwards. The reconnect interval is
/// deliberately fixed (no backoff growth, no jitter): the contract is a
/// bounded number of evenly spaced retries, then give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Base WebSocket URL of the chat endpoint.
    pub endpoint: String,

    /// User identifier, appended as the `_id` query parameter on connect.
    pub user_id: String,

    /// Room auto-joined on every successful open.
    pub default_room: String,

    /// Whether to retry after an unexpected close of a healthy session.
    pub auto_reconnect: bool,

    /// Cap on consecutive reconnect attempts.
    pub max_reconnect_attempts: u32,

    /// Fixed delay between reconnect attempts.
    pub reconnect_interval: Duration,

    /// Period between keep-alive pings.
    pub heartbeat_interval: Duration,

    /// Enables verbose per-frame logging. No behavioral effect.
    pub debug: bool,
}

// ============================================================================
// Constructors
// ============================================================================

impl ChatConfig {
    /// Creates a configuration with the required fields and default values
    /// for everything else.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Base WebSocket URL (e.g. `"wss://chat.example.com/ws"`)
    /// * `user_id` - User identifier sent as the `_id` query parameter
    #[must_use]
    pub fn new(endpoint: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            user_id: user_id.into(),
            default_room: DEFAULT_ROOM.to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            debug: true,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ChatConfig {
    /// Sets the room auto-joined on successful open.
    #[inline]
    #[must_use]
    pub fn with_default_room(mut self, room: impl Into<String>) -> Self {
        self.default_room = room.into();
        self
    }

    /// Enables or disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Sets the cap on consecutive reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the fixed delay between reconnect attempts.
    #[inline]
    #[must_use]
    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Sets the period between keep-alive pings.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Enables or disables verbose per-frame logging.
    #[inline]
    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::new("ws://localhost:8080", "alice");
        assert_eq!(config.endpoint, "ws://localhost:8080");
        assert_eq!(config.user_id, "alice");
        assert_eq!(config.default_room, "skyharvest");
        assert!(config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_interval, Duration::from_secs(5));
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
        assert!(config.debug);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ChatConfig::new("ws://localhost:8080", "alice")
            .with_default_room("lobby")
            .with_auto_reconnect(false)
            .with_max_reconnect_attempts(2)
            .with_reconnect_interval(Duration::from_millis(10))
            .with_heartbeat_interval(Duration::from_millis(20))
            .with_debug(false);

        assert_eq!(config.default_room, "lobby");
        assert!(!config.auto_reconnect);
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_interval, Duration::from_millis(10));
        assert_eq!(config.heartbeat_interval, Duration::from_millis(20));
        assert!(!config.debug);
    }

    #[test]
    fn test_config_is_clone_eq() {
        let config = ChatConfig::new("ws://localhost:8080", "alice");
        assert_eq!(config.clone(), config);
    }
}
