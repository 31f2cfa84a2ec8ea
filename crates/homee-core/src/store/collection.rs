// ── Generic reactive entity collection ──
//
// Concurrent storage keyed by hub id with O(1) lookups and push-based
// change notification via a `watch` version counter.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::Entity;

/// A concurrent, reactive collection for a single entity type.
///
/// Entities are stored behind `Arc` so snapshots are cheap; in-place
/// updates go through `Arc::make_mut`, which clones only when a snapshot
/// still holds the old value. Every mutation bumps a version counter;
/// the id-ordered snapshot is rebuilt on the next read after a bump, so a
/// single upsert stays O(1).
pub(crate) struct EntityCollection<T: Entity> {
    by_id: DashMap<i64, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Last built snapshot and the version it was built at.
    cache: Mutex<Cached<T>>,
}

struct Cached<T> {
    version: u64,
    values: Arc<Vec<Arc<T>>>,
}

impl<T: Entity> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);

        Self {
            by_id: DashMap::new(),
            version,
            cache: Mutex::new(Cached {
                version: 0,
                values: Arc::new(Vec::new()),
            }),
        }
    }

    /// Insert or replace an entity. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, entity: T) -> bool {
        self.upsert_with(entity, |current, incoming| *current = incoming)
    }

    /// Insert an entity, or fold it into the existing one with `merge`.
    /// Returns `true` if the id was new.
    pub(crate) fn upsert_with(&self, entity: T, merge: impl FnOnce(&mut T, T)) -> bool {
        let is_new = Self::apply(&self.by_id, entity, merge);
        self.bump();
        is_new
    }

    /// Upsert a batch, bumping the version once at the end.
    pub(crate) fn upsert_many(
        &self,
        entities: impl IntoIterator<Item = T>,
        merge: impl Fn(&mut T, T),
    ) -> usize {
        let mut inserted = 0;
        for entity in entities {
            if Self::apply(&self.by_id, entity, &merge) {
                inserted += 1;
            }
        }
        self.bump();
        inserted
    }

    pub(crate) fn get(&self, id: i64) -> Option<Arc<T>> {
        self.by_id.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Mutate one entity in place. Returns `None` if the id is unknown.
    pub(crate) fn modify<R>(&self, id: i64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let result = {
            let mut slot = self.by_id.get_mut(&id)?;
            f(Arc::make_mut(slot.value_mut()))
        };
        self.bump();
        Some(result)
    }

    /// Mutate every entity `stale` selects, bumping once if any changed.
    /// Unselected entities are not cloned. Returns the number mutated.
    pub(crate) fn update_where(
        &self,
        stale: impl Fn(&T) -> bool,
        mut f: impl FnMut(&mut T),
    ) -> usize {
        let mut changed = 0;
        for mut slot in self.by_id.iter_mut() {
            if stale(slot.value()) {
                f(Arc::make_mut(slot.value_mut()));
                changed += 1;
            }
        }
        if changed > 0 {
            self.bump();
        }
        changed
    }

    /// The id-ordered snapshot, rebuilt only if the collection changed
    /// since the last call.
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        // Read the version first: a mutation racing the rebuild leaves the
        // cache tagged older than its contents and forces another rebuild.
        let version = self.version();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if cache.version != version {
            let mut values: Vec<Arc<T>> =
                self.by_id.iter().map(|r| Arc::clone(r.value())).collect();
            values.sort_by_key(|v| v.id());
            *cache = Cached {
                version,
                values: Arc::new(values),
            };
        }
        Arc::clone(&cache.values)
    }

    /// Subscribe to the version counter. The current version is marked seen.
    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All current ids, unordered.
    pub(crate) fn ids(&self) -> Vec<i64> {
        self.by_id.iter().map(|r| *r.key()).collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn apply(by_id: &DashMap<i64, Arc<T>>, entity: T, merge: impl FnOnce(&mut T, T)) -> bool {
        match by_id.entry(entity.id()) {
            Entry::Occupied(mut slot) => {
                merge(Arc::make_mut(slot.get_mut()), entity);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(entity));
                true
            }
        }
    }

    fn bump(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: i64,
        label: &'static str,
        hits: u32,
    }

    impl Entity for Item {
        fn id(&self) -> i64 {
            self.id
        }
    }

    fn item(id: i64, label: &'static str) -> Item {
        Item { id, label, hits: 0 }
    }

    #[test]
    fn upsert_reports_new_ids() {
        let col = EntityCollection::new();
        assert!(col.upsert(item(1, "a")));
        assert!(!col.upsert(item(1, "b")));
        assert_eq!(col.get(1).unwrap().label, "b");
        assert_eq!(col.len(), 1);
    }

    #[test]
    fn upsert_with_merges_existing() {
        let col = EntityCollection::new();
        col.upsert(Item { id: 1, label: "a", hits: 3 });
        col.upsert_with(item(1, "b"), |current, incoming| {
            current.label = incoming.label;
        });

        let got = col.get(1).unwrap();
        assert_eq!(got.label, "b");
        assert_eq!(got.hits, 3);
    }

    #[test]
    fn snapshot_is_ordered_by_id() {
        let col = EntityCollection::new();
        col.upsert_many([item(3, "c"), item(1, "a"), item(2, "b")], |c, i| *c = i);

        let ids: Vec<i64> = col.snapshot().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn snapshot_is_rebuilt_only_after_a_change() {
        let col = EntityCollection::new();
        col.upsert(item(1, "a"));

        let first = col.snapshot();
        assert!(Arc::ptr_eq(&first, &col.snapshot()));

        col.modify(1, |i| i.hits += 1);
        let second = col.snapshot();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second[0].hits, 1);
    }

    #[test]
    fn upsert_many_bumps_once() {
        let col = EntityCollection::new();
        let before = col.version();
        let inserted = col.upsert_many([item(1, "a"), item(2, "b"), item(1, "c")], |c, i| *c = i);

        assert_eq!(inserted, 2);
        assert_eq!(col.version(), before + 1);
    }

    #[test]
    fn modify_leaves_old_snapshot_untouched() {
        let col = EntityCollection::new();
        col.upsert(item(1, "a"));
        let old = col.snapshot();

        let hits = col.modify(1, |i| {
            i.hits += 1;
            i.hits
        });

        assert_eq!(hits, Some(1));
        assert_eq!(old[0].hits, 0);
        assert_eq!(col.snapshot()[0].hits, 1);
        assert!(col.modify(9, |i| i.hits += 1).is_none());
    }

    #[test]
    fn update_where_touches_only_stale_entities() {
        let col = EntityCollection::new();
        col.upsert_many([item(1, "a"), item(2, "b")], |c, i| *c = i);
        let untouched = col.get(2).unwrap();

        assert_eq!(col.update_where(|i| i.id == 1, |i| i.hits = 7), 1);
        assert_eq!(col.get(1).unwrap().hits, 7);
        assert!(Arc::ptr_eq(&col.get(2).unwrap(), &untouched));

        let version = col.version();
        assert_eq!(col.update_where(|_| false, |i| i.hits = 0), 0);
        assert_eq!(col.version(), version);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let col = EntityCollection::new();
        let mut rx = col.subscribe();

        col.upsert(item(1, "a"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
        assert_eq!(col.snapshot().len(), 1);
    }
}
