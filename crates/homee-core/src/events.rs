// ── Event surface ──
//
// Everything observable that happens on a session is emitted as a
// `HubEvent`. Consumers either register synchronous callbacks (run on the
// emitting task, in registration order) or take a broadcast receiver for
// async consumption.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tracing::trace;

use crate::model::{Attribute, Node, NodeId, Warning};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── HubEvent ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// Socket opened. `retries` is the count the session recovered from.
    Connected { retries: u32 },
    /// About to retry after `attempt` consecutive failures.
    Reconnecting { attempt: u32 },
    /// Socket closed, with the failure if it was not a clean close.
    Disconnected { error: Option<String> },
    AttributeUpdated {
        node: Arc<Node>,
        attribute: Attribute,
    },
    Warning(Arc<Warning>),
    /// Every dispatched inbound message, raw.
    Message(Arc<serde_json::Value>),
    Error { message: String },
    MaxRetriesReached { retries: u32 },
}

impl HubEvent {
    /// The node an event concerns, for per-node listeners.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::AttributeUpdated { node, .. } => Some(node.id),
            _ => None,
        }
    }
}

// ── Subscriptions ────────────────────────────────────────────────────

/// Handle returned by [`EventHub::subscribe`]; pass it back to
/// [`EventHub::unsubscribe`] to remove the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(u64);

type Callback = Arc<dyn Fn(&HubEvent) + Send + Sync>;

struct Listener {
    node: Option<NodeId>,
    callback: Callback,
}

// ── EventHub ─────────────────────────────────────────────────────────

/// Fan-out point for session events. Cheap to clone; clones share the
/// same listeners.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<Subscription, Listener>>,
    tx: broadcast::Sender<Arc<HubEvent>>,
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(1),
                listeners: Mutex::new(BTreeMap::new()),
                tx,
            }),
        }
    }

    /// Register a callback for every event.
    pub fn subscribe(&self, callback: impl Fn(&HubEvent) + Send + Sync + 'static) -> Subscription {
        self.register(None, Arc::new(callback))
    }

    /// Register a callback for attribute updates on one node.
    pub fn subscribe_node(
        &self,
        node: NodeId,
        callback: impl Fn(&HubEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.register(Some(node), Arc::new(callback))
    }

    /// Remove a callback. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        self.listeners().remove(&subscription).is_some()
    }

    /// A receiver for async consumers. Slow receivers lag rather than
    /// block the session.
    pub fn listen(&self) -> broadcast::Receiver<Arc<HubEvent>> {
        self.inner.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners().len()
    }

    /// Deliver an event to matching callbacks, then to broadcast receivers.
    ///
    /// Callbacks are collected before any of them runs, so a callback may
    /// subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: HubEvent) {
        let target = event.node_id();
        let callbacks: Vec<Callback> = self
            .listeners()
            .values()
            .filter(|l| l.node.is_none() || l.node == target)
            .map(|l| Arc::clone(&l.callback))
            .collect();

        trace!(?event, callbacks = callbacks.len(), "emitting event");
        for callback in callbacks {
            callback(&event);
        }

        // No receivers is not an error.
        let _ = self.inner.tx.send(Arc::new(event));
    }

    fn register(&self, node: Option<NodeId>, callback: Callback) -> Subscription {
        let id = Subscription(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners().insert(id, Listener { node, callback });
        id
    }

    fn listeners(&self) -> std::sync::MutexGuard<'_, BTreeMap<Subscription, Listener>> {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listener_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use serde_json::json;

    fn attribute_event(node_id: NodeId) -> HubEvent {
        let node: Node = serde_json::from_value(json!({ "id": node_id })).unwrap();
        let attribute: Attribute =
            serde_json::from_value(json!({ "id": 1, "node_id": node_id })).unwrap();
        HubEvent::AttributeUpdated {
            node: Arc::new(node),
            attribute,
        }
    }

    fn counter(hub: &EventHub) -> (Subscription, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = hub.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (sub, hits)
    }

    #[test]
    fn callbacks_receive_events_until_unsubscribed() {
        let hub = EventHub::new();
        let (sub, hits) = counter(&hub);

        hub.emit(HubEvent::Connected { retries: 0 });
        assert!(hub.unsubscribe(sub));
        hub.emit(HubEvent::Connected { retries: 0 });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!hub.unsubscribe(sub));
    }

    #[test]
    fn node_listener_filters_by_node() {
        let hub = EventHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        hub.subscribe_node(7, move |event| {
            assert_eq!(event.node_id(), Some(7));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(attribute_event(7));
        hub.emit(attribute_event(8));
        hub.emit(HubEvent::Connected { retries: 0 });

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let hub = EventHub::new();
        let handle = Arc::new(Mutex::new(None::<Subscription>));
        let hub_ref = hub.clone();
        let slot = Arc::clone(&handle);
        let sub = hub.subscribe(move |_| {
            if let Some(sub) = *slot.lock().unwrap() {
                hub_ref.unsubscribe(sub);
            }
        });
        *handle.lock().unwrap() = Some(sub);

        hub.emit(HubEvent::Connected { retries: 0 });
        assert_eq!(hub.listener_count(), 0);
    }

    #[tokio::test]
    async fn broadcast_receivers_get_events() {
        let hub = EventHub::new();
        let mut rx = hub.listen();

        hub.emit(HubEvent::MaxRetriesReached { retries: 3 });
        let event = rx.recv().await.unwrap();
        assert_eq!(*event, HubEvent::MaxRetriesReached { retries: 3 });
    }
}
