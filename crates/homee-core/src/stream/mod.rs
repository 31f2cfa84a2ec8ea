// ── Reactive entity streams ──
//
// Subscription types for consuming entity changes from the DataStore.

use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Entity;
use crate::store::collection::EntityCollection;

type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A subscription to one entity collection.
///
/// Gives point-in-time snapshot access and change notification via
/// [`changed`](Self::changed) or by converting to a `Stream`. Several
/// mutations landing between two polls are observed as one change.
pub struct EntityStream<T: Entity> {
    source: Weak<EntityCollection<T>>,
    current: Snapshot<T>,
    receiver: watch::Receiver<u64>,
}

impl<T: Entity> EntityStream<T> {
    pub(crate) fn new(collection: &Arc<EntityCollection<T>>) -> Self {
        Self {
            receiver: collection.subscribe(),
            current: collection.snapshot(),
            source: Arc::downgrade(collection),
        }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// The latest snapshot, which may be newer than `current()`.
    pub fn latest(&self) -> Snapshot<T> {
        self.source
            .upgrade()
            .map_or_else(|| Arc::clone(&self.current), |c| c.snapshot())
    }

    /// Wait for the next change and return the new snapshot.
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        let snap = self.source.upgrade()?.snapshot();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> EntityWatchStream<T> {
        EntityWatchStream {
            inner: WatchStream::new(self.receiver),
            source: self.source,
        }
    }
}

/// `Stream` adapter yielding a fresh snapshot each time the collection
/// is mutated. The first item is the snapshot at conversion time.
pub struct EntityWatchStream<T: Entity> {
    inner: WatchStream<u64>,
    source: Weak<EntityCollection<T>>,
}

impl<T: Entity> Stream for EntityWatchStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(_)) => Poll::Ready(self.source.upgrade().map(|c| c.snapshot())),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures_util::StreamExt;
    use serde_json::json;

    use crate::model::Node;
    use crate::store::DataStore;

    fn node(id: i64) -> Node {
        serde_json::from_value(json!({ "id": id })).unwrap()
    }

    #[tokio::test]
    async fn changed_yields_new_snapshot() {
        let store = DataStore::new();
        let mut nodes = store.subscribe_nodes();
        assert!(nodes.current().is_empty());

        store.upsert_node(node(1));
        let snap = nodes.changed().await.unwrap();
        assert_eq!(snap.len(), 1);
        assert_eq!(nodes.current().len(), 1);
    }

    #[tokio::test]
    async fn stream_starts_with_current_snapshot() {
        let store = DataStore::new();
        store.upsert_node(node(1));
        let mut stream = store.subscribe_nodes().into_stream();

        assert_eq!(stream.next().await.unwrap().len(), 1);
        store.upsert_node(node(2));
        assert_eq!(stream.next().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn changed_ends_when_store_is_dropped() {
        let store = DataStore::new();
        let mut nodes = store.subscribe_nodes();
        drop(store);
        assert!(nodes.changed().await.is_none());
    }
}
