//! Event fan-out registry.
//!
//! Lets arbitrarily many independent consumers observe session activity
//! without coupling to the session internals. Three independent channels:
//!
//! | Channel | Payload | Fires on |
//! |---------|---------|----------|
//! | message | [`Envelope`] | every parsed inbound frame |
//! | connection | [`ConnectionState`] | every state transition |
//! | error | [`Error`] | transport/dial errors |
//!
//! Notification is synchronous with the triggering event and runs in
//! registration order. The subscriber set is snapshotted before invocation,
//! so a handler may subscribe or unsubscribe (itself included) re-entrantly.
//!
//! Subscribing returns a [`Subscription`]; calling
//! [`Subscription::unsubscribe`] removes exactly that handler, and calling it
//! twice is a no-op. Dropping the handle without unsubscribing leaves the
//! handler registered.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Error;
use crate::protocol::Envelope;
use crate::state::ConnectionState;

// ============================================================================
// Handler Types
// ============================================================================

/// Handler for parsed inbound envelopes.
pub type MessageHandler = dyn Fn(&Envelope) + Send + Sync;

/// Handler for connection-state transitions.
pub type ConnectionHandler = dyn Fn(ConnectionState) + Send + Sync;

/// Handler for transport errors.
pub type ErrorHandler = dyn Fn(&Error) + Send + Sync;

// ============================================================================
// HandlerSet
// ============================================================================

/// An ordered set of subscribers for one event channel.
struct HandlerSet<H: ?Sized> {
    /// Subscribers in registration order.
    entries: Arc<Mutex<Vec<(u64, Arc<H>)>>>,
}

impl<H: ?Sized> Default for HandlerSet<H> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<H: ?Sized> HandlerSet<H> {
    /// Registers a handler under a fresh id and returns its disposer.
    fn subscribe(&self, id: u64, handler: Arc<H>) -> Subscription
    where
        H: Send + Sync + 'static,
    {
        self.entries.lock().push((id, handler));
        Subscription::new(Arc::downgrade(&self.entries), id)
    }

    /// Invokes every registered handler in registration order.
    ///
    /// Snapshots the set first so handlers can mutate it while running.
    fn notify(&self, invoke: impl Fn(&H)) {
        let snapshot: Vec<Arc<H>> = self
            .entries
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in snapshot {
            invoke(&handler);
        }
    }

    /// Number of registered handlers.
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Disposer handle for one registered handler.
///
/// Holds only a weak reference to the subscriber set, so an outstanding
/// handle never keeps a dropped registry alive.
pub struct Subscription {
    /// Type-erased removal closure; idempotent.
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    fn new<H: ?Sized + Send + Sync + 'static>(
        entries: Weak<Mutex<Vec<(u64, Arc<H>)>>>,
        id: u64,
    ) -> Self {
        Self {
            remove: Box::new(move || {
                if let Some(entries) = entries.upgrade() {
                    entries.lock().retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Removes exactly this handler. Calling twice is a safe no-op.
    pub fn unsubscribe(&self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

// ============================================================================
// EventRegistry
// ============================================================================

/// Pub/sub distribution of session activity to subscribers.
#[derive(Default)]
pub struct EventRegistry {
    /// Id source shared by all three channels.
    next_id: AtomicU64,
    /// Inbound envelope subscribers.
    messages: HandlerSet<MessageHandler>,
    /// Connection-state subscribers.
    connections: HandlerSet<ConnectionHandler>,
    /// Transport-error subscribers.
    errors: HandlerSet<ErrorHandler>,
}

impl EventRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for all parsed inbound envelopes.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.messages.subscribe(self.next_id(), Arc::new(handler))
    }

    /// Registers a handler for every connection-state transition.
    pub fn on_connection<F>(&self, handler: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.connections
            .subscribe(self.next_id(), Arc::new(handler))
    }

    /// Registers a handler for transport errors.
    pub fn on_error<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.errors.subscribe(self.next_id(), Arc::new(handler))
    }

    /// Fans an envelope out to all message subscribers.
    pub fn notify_message(&self, envelope: &Envelope) {
        trace!(subscribers = self.messages.len(), "fan-out: message");
        self.messages.notify(|handler| handler(envelope));
    }

    /// Fans a state transition out to all connection subscribers.
    pub fn notify_connection(&self, state: ConnectionState) {
        trace!(%state, "fan-out: connection state");
        self.connections.notify(|handler| handler(state));
    }

    /// Fans an error out to all error subscribers.
    pub fn notify_error(&self, error: &Error) {
        trace!(subscribers = self.errors.len(), "fan-out: error");
        self.errors.notify(|handler| handler(error));
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    fn envelope(room: &str) -> Envelope {
        Envelope {
            room: Some(room.to_string()),
            ..Envelope::default()
        }
    }

    #[test]
    fn test_message_fan_out() {
        let registry = EventRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_clone = Arc::clone(&count);
        let _sub = registry.on_message(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_message(&envelope("lobby"));
        registry.notify_message(&envelope("lobby"));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_notification_in_registration_order() {
        let registry = EventRegistry::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            // Dropping the handle keeps the handler registered.
            let _ = registry.on_message(move |_| {
                order.lock().unwrap().push(tag);
            });
        }

        registry.notify_message(&envelope("lobby"));
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_isolates_other_handlers() {
        let registry = EventRegistry::new();
        let hits_a = Arc::new(AtomicUsize::new(0));
        let hits_b = Arc::new(AtomicUsize::new(0));

        let a = Arc::clone(&hits_a);
        let sub_a = registry.on_message(move |_| {
            a.fetch_add(1, Ordering::SeqCst);
        });
        let b = Arc::clone(&hits_b);
        let _sub_b = registry.on_message(move |_| {
            b.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_message(&envelope("lobby"));
        sub_a.unsubscribe();
        registry.notify_message(&envelope("lobby"));

        assert_eq!(hits_a.load(Ordering::SeqCst), 1);
        assert_eq!(hits_b.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_twice_is_noop() {
        let registry = EventRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let hits_clone = Arc::clone(&hits);
        let sub = registry.on_message(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        registry.notify_message(&envelope("lobby"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reentrant_unsubscribe_during_notify() {
        let registry = Arc::new(EventRegistry::new());
        let hits = Arc::new(AtomicUsize::new(0));

        let slot: Arc<StdMutex<Option<Subscription>>> = Arc::new(StdMutex::new(None));
        let slot_clone = Arc::clone(&slot);
        let hits_clone = Arc::clone(&hits);
        let sub = registry.on_message(move |_| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
            // Unsubscribe self from inside the notification.
            if let Some(sub) = slot_clone.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        registry.notify_message(&envelope("lobby"));
        registry.notify_message(&envelope("lobby"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_subscribe_during_notify() {
        let registry = Arc::new(EventRegistry::new());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let registry_clone = Arc::clone(&registry);
        let late = Arc::clone(&late_hits);
        let _sub = registry.on_message(move |_| {
            let late = Arc::clone(&late);
            let _ = registry_clone.on_message(move |_| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        // The handler registered mid-notification must not see the
        // triggering event, only subsequent ones.
        registry.notify_message(&envelope("lobby"));
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);

        registry.notify_message(&envelope("lobby"));
        assert!(late_hits.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_channels_are_independent() {
        let registry = EventRegistry::new();
        let message_hits = Arc::new(AtomicUsize::new(0));
        let state_hits = Arc::new(AtomicUsize::new(0));
        let error_hits = Arc::new(AtomicUsize::new(0));

        let m = Arc::clone(&message_hits);
        let _m_sub = registry.on_message(move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        });
        let s = Arc::clone(&state_hits);
        let _s_sub = registry.on_connection(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let e = Arc::clone(&error_hits);
        let _e_sub = registry.on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify_connection(ConnectionState::Connecting);
        registry.notify_error(&Error::ConnectionClosed);

        assert_eq!(message_hits.load(Ordering::SeqCst), 0);
        assert_eq!(state_hits.load(Ordering::SeqCst), 1);
        assert_eq!(error_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_connection_handler_receives_state() {
        let registry = EventRegistry::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));

        let seen_clone = Arc::clone(&seen);
        let _sub = registry.on_connection(move |state| {
            seen_clone.lock().unwrap().push(state);
        });

        registry.notify_connection(ConnectionState::Connecting);
        registry.notify_connection(ConnectionState::Connected);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
    }
}
