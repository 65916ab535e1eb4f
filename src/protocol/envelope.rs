//! Inbound envelope parsing.
//!
//! The server sends arbitrary JSON objects; which fields are present depends
//! on what triggered the frame (a chat message, a presence notice, a reply
//! to a user-list or history request, an ack). No field is guaranteed, so
//! [`Envelope`] models every field as optional and consumers pick out what
//! they care about.
//!
//! Frames that do not parse as a JSON object are logged and dropped by the
//! session; they never reach subscribers.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// A parsed inbound frame.
///
/// Every field is optional; absent fields deserialize to `None` and unknown
/// fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Room the frame is scoped to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,

    /// Sender user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Direct-message target user id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Chat message content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Echoed send content (the server relays outbound sends to other
    /// members with the content still under `send`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<String>,

    /// Message key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Server-side timestamp, milliseconds since epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,

    /// User id that joined the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined: Option<String>,

    /// User id that left the room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<String>,

    /// Reply to a user-list request: member ids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replyuserlist: Option<Vec<String>>,

    /// Reply to a history request: key/value entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replygetkeys: Option<Vec<HistoryEntry>>,

    /// Delivery ack flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received: Option<bool>,
}

// ============================================================================
// HistoryEntry
// ============================================================================

/// One entry in a history reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Message key, `{room}_{timestamp_ms}_{user}`.
    #[serde(default)]
    pub key: String,

    /// The stored message envelope.
    #[serde(default)]
    pub value: Envelope,
}

// ============================================================================
// Parsing & Accessors
// ============================================================================

impl Envelope {
    /// Parses a raw socket frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Returns `true` if this frame carries a presence notice.
    #[inline]
    #[must_use]
    pub fn is_presence(&self) -> bool {
        self.joined.is_some() || self.left.is_some()
    }

    /// Returns `true` if this frame is a delivery ack.
    #[inline]
    #[must_use]
    pub fn is_ack(&self) -> bool {
        self.received.unwrap_or(false)
    }

    /// Chat content, whichever of `message`/`send` the server used.
    #[inline]
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.message.as_deref().or(self.send.as_deref())
    }

    /// Member ids from a user-list reply, if present.
    #[inline]
    #[must_use]
    pub fn user_list(&self) -> Option<&[String]> {
        self.replyuserlist.as_deref()
    }

    /// History entries from a history reply, if present.
    #[inline]
    #[must_use]
    pub fn history(&self) -> Option<&[HistoryEntry]> {
        self.replygetkeys.as_deref()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_chat_message() {
        let envelope = Envelope::parse(
            r#"{"room":"lobby","from":"bob","message":"hi","key":"lobby_1_bob","timestamp":1700000000000}"#,
        )
        .expect("parse");

        assert_eq!(envelope.room.as_deref(), Some("lobby"));
        assert_eq!(envelope.from.as_deref(), Some("bob"));
        assert_eq!(envelope.content(), Some("hi"));
        assert_eq!(envelope.timestamp, Some(1_700_000_000_000));
        assert!(!envelope.is_presence());
        assert!(!envelope.is_ack());
    }

    #[test]
    fn test_parse_empty_object() {
        let envelope = Envelope::parse("{}").expect("parse");
        assert_eq!(envelope, Envelope::default());
        assert!(envelope.content().is_none());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let envelope =
            Envelope::parse(r#"{"room":"x","totally":"new","nested":{"a":1}}"#).expect("parse");
        assert_eq!(envelope.room.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_presence_notice() {
        let joined = Envelope::parse(r#"{"room":"lobby","joined":"carol"}"#).expect("parse");
        assert!(joined.is_presence());
        assert_eq!(joined.joined.as_deref(), Some("carol"));

        let left = Envelope::parse(r#"{"room":"lobby","left":"carol"}"#).expect("parse");
        assert!(left.is_presence());
    }

    #[test]
    fn test_parse_user_list_reply() {
        let envelope =
            Envelope::parse(r#"{"replyuserlist":["alice","bob"]}"#).expect("parse");
        assert_eq!(
            envelope.user_list(),
            Some(["alice".to_string(), "bob".to_string()].as_slice())
        );
    }

    #[test]
    fn test_parse_history_reply() {
        let envelope = Envelope::parse(
            r#"{"replygetkeys":[
                {"key":"lobby_1_alice","value":{"room":"lobby","send":"first","key":"lobby_1_alice"}},
                {"key":"lobby_2_bob","value":{"room":"lobby","send":"second"}}
            ]}"#,
        )
        .expect("parse");

        let history = envelope.history().expect("history entries");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].key, "lobby_1_alice");
        assert_eq!(history[0].value.content(), Some("first"));
        assert_eq!(history[1].value.content(), Some("second"));
    }

    #[test]
    fn test_parse_ack() {
        let envelope = Envelope::parse(r#"{"received":true}"#).expect("parse");
        assert!(envelope.is_ack());
    }

    #[test]
    fn test_content_prefers_message_over_send() {
        let envelope = Envelope::parse(r#"{"message":"a","send":"b"}"#).expect("parse");
        assert_eq!(envelope.content(), Some("a"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Envelope::parse("not json at all").is_err());
        assert!(Envelope::parse("42").is_err());
        assert!(Envelope::parse("[1,2,3]").is_err());
        assert!(Envelope::parse("\"just a string\"").is_err());
    }

    proptest! {
        // Parsing must never panic, whatever the server sends.
        #[test]
        fn test_parse_never_panics(text in ".*") {
            let _ = Envelope::parse(&text);
        }

        #[test]
        fn test_arbitrary_objects_parse(room in "[a-z]{0,12}", ts in any::<u64>()) {
            let text = format!(r#"{{"room":"{room}","timestamp":{ts}}}"#);
            let envelope = Envelope::parse(&text).expect("object parses");
            prop_assert_eq!(envelope.timestamp, Some(ts));
        }
    }
}
