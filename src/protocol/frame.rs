//! Outbound frame shapes.
//!
//! Every operation the client performs is one JSON object written to the
//! socket. The server distinguishes operations by which fields are present,
//! not by a type tag, so [`Frame`] serializes untagged with the exact field
//! set of each shape.
//!
//! # Wire Shapes
//!
//! | Operation | Shape |
//! |-----------|-------|
//! | Join | `{"join": room, "notifyjoin": bool, "notifyleave": bool}` |
//! | Leave | `{"leave": room}` |
//! | List users | `{"userlist": room, "skip": n, "limit": n}` (`-1` = unlimited) |
//! | Send (broadcast) | `{"room": room, "send": content, "key": key}` |
//! | Send (direct) | `{"room": room, "send": content, "to": user, "key": key}` |
//! | History | `{"getkeys": "<room>_*", "skip": n, "limit": n}` |
//! | Heartbeat | `{"ping": "1"}` |

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

// ============================================================================
// Frame
// ============================================================================

/// An outbound protocol frame.
///
/// Serialize-only: the server never echoes these shapes back verbatim
/// (inbound traffic is parsed as [`crate::protocol::Envelope`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Frame {
    /// Join a room, optionally announcing the join/leave to other members.
    Join {
        /// Room to join.
        join: String,
        /// Whether other members are told about this join.
        notifyjoin: bool,
        /// Whether other members are told about the eventual leave.
        notifyleave: bool,
    },

    /// Leave a room.
    Leave {
        /// Room to leave.
        leave: String,
    },

    /// Request the member list of a room.
    UserList {
        /// Room whose members are listed.
        userlist: String,
        /// Entries to skip.
        skip: i64,
        /// Maximum entries to return (`-1` = unlimited).
        limit: i64,
    },

    /// Send a chat message, broadcast or direct.
    Send {
        /// Target room.
        room: String,
        /// Message content.
        send: String,
        /// Direct-message target; omitted for broadcasts.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Message key for history lookup and deduplication.
        key: String,
    },

    /// Fetch message history by key pattern.
    GetKeys {
        /// Key pattern, `"<room>_*"`.
        getkeys: String,
        /// Entries to skip.
        skip: u64,
        /// Maximum entries to return.
        limit: u64,
    },

    /// Keep-alive ping. Fire-and-forget, no response awaited.
    Ping {
        /// Always `"1"`.
        ping: String,
    },
}

// ============================================================================
// Constructors
// ============================================================================

impl Frame {
    /// Creates a join frame.
    #[inline]
    #[must_use]
    pub fn join(room: impl Into<String>, notify_join: bool, notify_leave: bool) -> Self {
        Self::Join {
            join: room.into(),
            notifyjoin: notify_join,
            notifyleave: notify_leave,
        }
    }

    /// Creates a leave frame.
    #[inline]
    #[must_use]
    pub fn leave(room: impl Into<String>) -> Self {
        Self::Leave { leave: room.into() }
    }

    /// Creates a user-list frame requesting the full member list.
    #[inline]
    #[must_use]
    pub fn user_list(room: impl Into<String>) -> Self {
        Self::UserList {
            userlist: room.into(),
            skip: 0,
            limit: -1,
        }
    }

    /// Creates a broadcast send frame.
    #[inline]
    #[must_use]
    pub fn send(room: impl Into<String>, content: impl Into<String>, key: String) -> Self {
        Self::Send {
            room: room.into(),
            send: content.into(),
            to: None,
            key,
        }
    }

    /// Creates a direct send frame.
    #[inline]
    #[must_use]
    pub fn send_to(
        room: impl Into<String>,
        content: impl Into<String>,
        to: impl Into<String>,
        key: String,
    ) -> Self {
        Self::Send {
            room: room.into(),
            send: content.into(),
            to: Some(to.into()),
            key,
        }
    }

    /// Creates a history-fetch frame for a room's key pattern.
    #[inline]
    #[must_use]
    pub fn get_keys(room: &str, skip: u64, limit: u64) -> Self {
        Self::GetKeys {
            getkeys: format!("{room}_*"),
            skip,
            limit,
        }
    }

    /// Creates a heartbeat frame.
    #[inline]
    #[must_use]
    pub fn ping() -> Self {
        Self::Ping {
            ping: "1".to_string(),
        }
    }
}

// ============================================================================
// Message Keys
// ============================================================================

/// Builds a message key from its parts: `{room}_{timestamp_ms}_{user}`.
///
/// Keys order a room's history and serve as lookup handles. They are not
/// globally unique: two sends from the same user in the same room within the
/// same millisecond collide. That gap is inherited from the wire contract
/// and deliberately not papered over here; callers needing stronger
/// uniqueness can pass an explicit key.
#[inline]
#[must_use]
pub fn message_key(room: &str, user_id: &str, timestamp_ms: u64) -> String {
    format!("{room}_{timestamp_ms}_{user_id}")
}

/// Builds a message key for the current wall-clock millisecond.
#[inline]
#[must_use]
pub fn default_message_key(room: &str, user_id: &str) -> String {
    message_key(room, user_id, unix_millis())
}

/// Milliseconds since the Unix epoch.
#[inline]
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json, to_value};

    fn as_json(frame: &Frame) -> Value {
        to_value(frame).expect("serialize frame")
    }

    #[test]
    fn test_join_shape() {
        let frame = Frame::join("lobby", true, false);
        assert_eq!(
            as_json(&frame),
            json!({"join": "lobby", "notifyjoin": true, "notifyleave": false})
        );
    }

    #[test]
    fn test_leave_shape() {
        let frame = Frame::leave("lobby");
        assert_eq!(as_json(&frame), json!({"leave": "lobby"}));
    }

    #[test]
    fn test_user_list_requests_unlimited() {
        let frame = Frame::user_list("lobby");
        assert_eq!(
            as_json(&frame),
            json!({"userlist": "lobby", "skip": 0, "limit": -1})
        );
    }

    #[test]
    fn test_broadcast_send_omits_to() {
        let frame = Frame::send("lobby", "hello", "lobby_1_alice".to_string());
        let value = as_json(&frame);
        assert_eq!(
            value,
            json!({"room": "lobby", "send": "hello", "key": "lobby_1_alice"})
        );
        assert!(value.get("to").is_none());
    }

    #[test]
    fn test_direct_send_includes_to() {
        let frame = Frame::send_to("lobby", "psst", "bob", "lobby_1_alice".to_string());
        assert_eq!(
            as_json(&frame),
            json!({"room": "lobby", "send": "psst", "to": "bob", "key": "lobby_1_alice"})
        );
    }

    #[test]
    fn test_get_keys_pattern() {
        let frame = Frame::get_keys("lobby", 0, 500);
        assert_eq!(
            as_json(&frame),
            json!({"getkeys": "lobby_*", "skip": 0, "limit": 500})
        );
    }

    #[test]
    fn test_ping_shape() {
        assert_eq!(as_json(&Frame::ping()), json!({"ping": "1"}));
    }

    #[test]
    fn test_message_key_format() {
        assert_eq!(message_key("lobby", "alice", 1234), "lobby_1234_alice");
    }

    #[test]
    fn test_message_keys_distinct_across_milliseconds() {
        // Same user and room, adjacent timestamps: keys must differ.
        let a = message_key("lobby", "alice", 1000);
        let b = message_key("lobby", "alice", 1001);
        assert_ne!(a, b);
    }

    #[test]
    fn test_message_keys_collide_within_millisecond() {
        // Known gap in the key scheme: same millisecond means same key.
        let a = message_key("lobby", "alice", 1000);
        let b = message_key("lobby", "alice", 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_message_key_uses_wall_clock() {
        let before = unix_millis();
        let key = default_message_key("lobby", "alice");
        let after = unix_millis();

        let middle: u64 = key
            .strip_prefix("lobby_")
            .and_then(|rest| rest.strip_suffix("_alice"))
            .expect("key shape")
            .parse()
            .expect("timestamp part");
        assert!(middle >= before && middle <= after);
    }
}
