//! Entry point for building persisted values
//!
//! A [`Persistence`] pairs a store with the queue its writes go through. Every
//! saveable built from one handle shares that queue, so writes to any of them
//! land in the order they were made.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::lazy::LazySaveable;
use super::list::SaveableList;
use super::map::SaveableMap;
use super::saveable::Saveable;
use crate::domain::{Codec, Key, SavePolicy};
use crate::storage::{PersistenceStore, SaveQueue, Saver};

#[derive(Debug, Clone)]
pub struct Persistence {
    store: Arc<PersistenceStore>,
    queue: SaveQueue,
}

impl Persistence {
    pub fn new(store: Arc<PersistenceStore>, queue: SaveQueue) -> Self {
        Self { store, queue }
    }

    /// Store under an explicit root with its own queue
    pub fn at(root: impl Into<std::path::PathBuf>) -> Self {
        Self::new(Arc::new(PersistenceStore::new(root)), SaveQueue::new())
    }

    /// The process-wide store and queue
    ///
    /// # Panics
    ///
    /// Panics if no storage root has been configured.
    pub fn global() -> Self {
        Self::new(PersistenceStore::global(), SaveQueue::global())
    }

    pub fn store(&self) -> &Arc<PersistenceStore> {
        &self.store
    }

    pub fn queue(&self) -> &SaveQueue {
        &self.queue
    }

    fn saver<T>(&self, codec: impl Codec<T> + 'static) -> Saver<T> {
        Saver::new(self.store.clone(), codec)
    }

    /// Loads a scalar value, `default` when there is no usable record
    pub fn state<T: Clone + PartialEq>(
        &self,
        key: Key,
        default: T,
        policy: SavePolicy,
        codec: impl Codec<T> + 'static,
    ) -> Saveable<T> {
        Saveable::open(key, default, policy, self.saver(codec), self.queue.clone())
    }

    pub fn list<T: Clone + PartialEq>(
        &self,
        key: Key,
        default: Vec<T>,
        policy: SavePolicy,
        codec: impl Codec<Vec<T>> + 'static,
    ) -> SaveableList<T> {
        SaveableList::new(self.state(key, default, policy, codec))
    }

    pub fn map<K: Ord + Clone, V: Clone + PartialEq>(
        &self,
        key: Key,
        default: BTreeMap<K, V>,
        policy: SavePolicy,
        codec: impl Codec<BTreeMap<K, V>> + 'static,
    ) -> SaveableMap<K, V> {
        SaveableMap::new(self.state(key, default, policy, codec))
    }

    /// A value whose key is bound on first access
    pub fn lazy<T: Clone + PartialEq>(
        &self,
        default: T,
        codec: impl Codec<T> + 'static,
    ) -> LazySaveable<T> {
        LazySaveable::new(default, self.saver(codec), self.queue.clone())
    }

    /// Writes `value` under `key` right away, bypassing the queue
    ///
    /// Failures are reported through the store's diagnostics, not returned.
    pub fn save_value<T>(&self, key: &Key, value: &T, codec: impl Codec<T> + 'static) {
        self.saver(codec).save_data(key, value);
    }

    /// Blocks until every queued write has reached the store
    pub fn flush(&self) {
        self.queue.flush();
    }
}
