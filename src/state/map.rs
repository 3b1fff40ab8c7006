//! Persisted key/value mapping
//!
//! Backed by a `BTreeMap` so equal maps always encode to the same bytes.
//! Mutations commit the whole next map through [`Saveable::update`].

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::ops::Deref;

use super::saveable::Saveable;

pub struct SaveableMap<K: Ord + Clone, V: Clone + PartialEq> {
    state: Saveable<BTreeMap<K, V>>,
}

impl<K: Ord + Clone, V: Clone + PartialEq> SaveableMap<K, V> {
    pub fn new(state: Saveable<BTreeMap<K, V>>) -> Self {
        Self { state }
    }

    /// Returns the underlying saveable
    pub fn state(&self) -> &Saveable<BTreeMap<K, V>> {
        &self.state
    }

    pub fn into_state(self) -> Saveable<BTreeMap<K, V>> {
        self.state
    }

    /// Tears the value down, running the dispose-time save check
    pub fn dispose(self) {
        self.state.dispose();
    }

    pub fn len(&self) -> usize {
        self.state.with_value(BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.state.with_value(BTreeMap::is_empty)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.state.with_value(|map| map.get(key).cloned())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.state.with_value(|map| map.contains_key(key))
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.state.with_value(|map| map.values().any(|v| v == value))
    }

    /// Returns a copy of the keys in order
    pub fn keys(&self) -> Vec<K> {
        self.state.with_value(|map| map.keys().cloned().collect())
    }

    /// Returns a copy of the values in key order
    pub fn values(&self) -> Vec<V> {
        self.state.with_value(|map| map.values().cloned().collect())
    }

    /// Returns a copy of the whole map
    pub fn to_map(&self) -> BTreeMap<K, V> {
        self.state.value()
    }

    /// Inserts an entry, returning the previous value for `key`
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.state.update(|map| map.insert(key, value))
    }

    /// Merges `entries` into the map, later entries winning
    pub fn merge(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.state.update(|map| map.extend(entries));
    }

    /// Removes the entry for `key`, returning its value
    pub fn remove_key<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.state.update(|map| map.remove(key))
    }

    /// Keeps only entries matching `keep`, returning true if any was removed
    ///
    /// `keep` runs under the value lock, like [`Saveable::update`], and must
    /// not access this map.
    pub fn retain(&self, mut keep: impl FnMut(&K, &V) -> bool) -> bool {
        self.state.update(|map| {
            let before = map.len();
            map.retain(|k, v| keep(k, &*v));
            map.len() != before
        })
    }

    pub fn clear(&self) {
        self.state.set_value(BTreeMap::new());
    }

    pub fn replace_all(&self, entries: impl IntoIterator<Item = (K, V)>) {
        self.state.set_value(entries.into_iter().collect());
    }
}

impl<K: Ord + Clone, V: Clone + PartialEq> Deref for SaveableMap<K, V> {
    type Target = Saveable<BTreeMap<K, V>>;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Key, SavePolicy};
    use crate::state::saveable::tests::CountingCodec;
    use crate::storage::{PersistenceStore, SaveQueue, Saver};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open_map(
        dir: &TempDir,
        policy: SavePolicy,
    ) -> (SaveableMap<String, u32>, Arc<AtomicUsize>, SaveQueue) {
        let store = Arc::new(PersistenceStore::new(dir.path()));
        let (codec, encodes) = CountingCodec::new();
        let queue = SaveQueue::new();
        let state = Saveable::open(
            Key::new("scores").unwrap(),
            BTreeMap::new(),
            policy,
            Saver::new(store, codec),
            queue.clone(),
        );
        (SaveableMap::new(state), encodes, queue)
    }

    fn stored(dir: &TempDir) -> Option<BTreeMap<String, u32>> {
        std::fs::read(dir.path().join("scores"))
            .ok()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn insert_merge_remove() {
        let dir = TempDir::new().unwrap();
        let (map, _, queue) = open_map(&dir, SavePolicy::Immediate);

        assert_eq!(map.insert("ada".to_string(), 1), None);
        assert_eq!(map.insert("ada".to_string(), 2), Some(1));
        map.merge([("bob".to_string(), 5), ("cy".to_string(), 7)]);
        assert_eq!(map.remove_key("cy"), Some(7));
        assert_eq!(map.remove_key("nobody"), None);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("ada"), Some(2));
        assert!(map.contains_key("bob"));
        assert!(map.contains_value(&5));
        assert!(!map.contains_value(&7));
        assert_eq!(map.keys(), vec!["ada".to_string(), "bob".to_string()]);
        assert_eq!(map.values(), vec![2, 5]);

        queue.flush();
        assert_eq!(stored(&dir), Some(map.to_map()));
    }

    #[test]
    fn equal_results_do_not_save() {
        let dir = TempDir::new().unwrap();
        let (map, encodes, queue) = open_map(&dir, SavePolicy::Immediate);

        map.insert("ada".to_string(), 1);
        map.insert("ada".to_string(), 1);
        map.remove_key("nobody");
        map.retain(|_, _| true);
        map.replace_all([("ada".to_string(), 1)]);
        queue.flush();

        assert_eq!(encodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn retain_and_clear() {
        let dir = TempDir::new().unwrap();
        let (map, _, _) = open_map(&dir, SavePolicy::Immediate);
        map.replace_all([("a".to_string(), 1), ("b".to_string(), 2)]);

        assert!(map.retain(|_, v| *v > 1));
        assert_eq!(map.keys(), vec!["b".to_string()]);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn reopen_restores_entries() {
        let dir = TempDir::new().unwrap();
        {
            let (map, _, queue) = open_map(&dir, SavePolicy::OnDispose);
            map.insert("ada".to_string(), 3);
            map.dispose();
            queue.flush();
        }

        let (map, _, _) = open_map(&dir, SavePolicy::Immediate);
        assert_eq!(map.get("ada"), Some(3));
        assert!(!map.changed_since_init());
    }
}
