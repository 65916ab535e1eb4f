//! Multi-room membership tracking.
//!
//! [`ChatClient`] itself only remembers the last-joined room. Applications
//! that keep a user in several rooms at once layer a [`RoomTracker`] on top:
//! it mirrors join and leave calls into a local set so the membership list
//! can be rendered without asking the server.
//!
//! The set is this client's view, not the server's. A reconnect only
//! re-joins the default room, so after one the tracker may list rooms the
//! server no longer has this user in.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::transport::ChatClient;

// ============================================================================
// RoomTracker
// ============================================================================

/// Tracks which rooms have been joined through it.
///
/// Join and leave calls pass through to the underlying [`ChatClient`] and
/// update the local set. Rooms joined directly on the client are not seen.
#[derive(Debug)]
pub struct RoomTracker {
    /// Underlying session handle.
    client: ChatClient,
    /// Rooms joined via this tracker and not yet left.
    rooms: Mutex<FxHashSet<String>>,
}

impl RoomTracker {
    /// Wraps a client handle.
    #[must_use]
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            rooms: Mutex::new(FxHashSet::default()),
        }
    }

    /// Joins a room and records the membership.
    ///
    /// Re-joining a room already in the set still sends the join frame;
    /// the set is unchanged.
    pub fn join_room(&self, room: impl Into<String>) {
        let room = room.into();
        self.client.join_room(room.clone());
        self.rooms.lock().insert(room);
    }

    /// Leaves a room and drops it from the set.
    ///
    /// Leaving a room that was never joined is a no-op on the set; the
    /// leave frame is sent regardless.
    pub fn leave_room(&self, room: impl Into<String>) {
        let room = room.into();
        self.client.leave_room(room.clone());
        self.rooms.lock().remove(&room);
    }

    /// Leaves every tracked room.
    pub fn leave_all(&self) {
        let rooms: Vec<String> = self.rooms.lock().drain().collect();
        for room in rooms {
            self.client.leave_room(room);
        }
    }

    /// Whether a room is in the tracked set.
    #[must_use]
    pub fn is_in_room(&self, room: &str) -> bool {
        self.rooms.lock().contains(room)
    }

    /// Tracked rooms, sorted for stable iteration.
    #[must_use]
    pub fn rooms(&self) -> Vec<String> {
        let mut rooms: Vec<String> = self.rooms.lock().iter().cloned().collect();
        rooms.sort_unstable();
        rooms
    }

    /// Number of tracked rooms.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.lock().len()
    }

    /// Whether no rooms are tracked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.lock().is_empty()
    }

    /// The underlying client handle.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &ChatClient {
        &self.client
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChatConfig;

    fn tracker() -> RoomTracker {
        // Frames are dropped while disconnected; only the set is observed.
        let config = ChatConfig::new("ws://chat.test/ws", "alice").with_auto_reconnect(false);
        RoomTracker::new(ChatClient::new(config))
    }

    #[tokio::test]
    async fn test_join_and_leave_update_set() {
        let tracker = tracker();
        assert!(tracker.is_empty());

        tracker.join_room("a");
        tracker.join_room("b");
        tracker.join_room("a");
        assert_eq!(tracker.len(), 2);
        assert!(tracker.is_in_room("a"));
        assert!(tracker.is_in_room("b"));

        tracker.leave_room("a");
        assert!(!tracker.is_in_room("a"));
        assert_eq!(tracker.rooms(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_rooms_are_sorted() {
        let tracker = tracker();
        tracker.join_room("zebra");
        tracker.join_room("alpha");
        tracker.join_room("mid");
        assert_eq!(
            tracker.rooms(),
            vec!["alpha".to_string(), "mid".to_string(), "zebra".to_string()]
        );
    }

    #[tokio::test]
    async fn test_leave_all_clears_set() {
        let tracker = tracker();
        tracker.join_room("a");
        tracker.join_room("b");
        tracker.leave_all();
        assert!(tracker.is_empty());
        assert!(!tracker.is_in_room("a"));
    }

    #[tokio::test]
    async fn test_leave_untracked_room_is_noop_on_set() {
        let tracker = tracker();
        tracker.join_room("a");
        tracker.leave_room("ghost");
        assert_eq!(tracker.rooms(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_tracker_updates_client_current_room() {
        let tracker = tracker();
        tracker.join_room("lobby");
        assert_eq!(tracker.client().current_room(), "lobby");
    }
}
