//! The persisted value pipeline
//!
//! A [`Saveable`] owns an observable value bound to one record. Every change,
//! whatever API produced it, ends up in the same place: the new whole value is
//! committed to the cell and, if it differs from the old one under an
//! [`Immediate`](SavePolicy::Immediate) policy, encoded and handed to the save
//! queue. Encoding happens on the caller's thread while the cell is locked, so
//! records are written in the same order the values were set.
//!
//! Under [`OnDispose`](SavePolicy::OnDispose) nothing is written until the
//! saveable is dropped; then the value is saved once if it differs from the
//! value loaded at construction.

use std::fmt;
use std::sync::Arc;

use super::observable::{Observable, SubscriptionId};
use crate::domain::{Key, SavePolicy};
use crate::storage::{PersistenceStore, SaveQueue, Saver};

pub struct Saveable<T: Clone + PartialEq> {
    key: Key,
    cell: Observable<T>,
    initial: T,
    policy: SavePolicy,
    saver: Saver<T>,
    queue: SaveQueue,
}

impl<T: Clone + PartialEq> Saveable<T> {
    /// Loads the value for `key`, falling back to `default` on any failure
    ///
    /// The load is synchronous: the value is usable as soon as this returns.
    pub fn open(key: Key, default: T, policy: SavePolicy, saver: Saver<T>, queue: SaveQueue) -> Self {
        let initial = saver.read_data(&key, default);
        tracing::debug!(%key, %policy, "saveable opened");

        Self {
            cell: Observable::new(initial.clone()),
            key,
            initial,
            policy,
            saver,
            queue,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// The value loaded at construction
    pub fn initial_value(&self) -> &T {
        &self.initial
    }

    /// Returns a copy of the current value
    pub fn value(&self) -> T {
        self.cell.get()
    }

    /// Runs `f` against the current value without copying it
    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.cell.with(f)
    }

    /// Replaces the value, returning true if it changed
    pub fn set_value(&self, value: T) -> bool {
        self.cell
            .set_with(value, |new| self.on_change(new))
            .is_some()
    }

    /// Mutates a copy of the value and commits the result as a whole
    ///
    /// `f` runs while the value is write-locked: it must not read or change
    /// this saveable (or a list/map wrapping it), or the call deadlocks. Take
    /// what it needs before calling.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.cell.modify_with(f, |new| self.on_change(new)).0
    }

    fn on_change(&self, value: &T) {
        if self.policy.saves_on_change() {
            self.schedule_save(value);
        }
    }

    fn schedule_save(&self, value: &T) {
        if self.saver.is_absent(value) {
            self.queue.delete(self.saver.store(), self.key.clone());
        } else if let Some(bytes) = self.saver.encode(&self.key, value) {
            self.queue.save(self.saver.store(), self.key.clone(), bytes);
        }
    }

    /// Schedules a save of the current value regardless of policy
    ///
    /// A value the codec considers absent deletes the record instead.
    pub fn save_now(&self) {
        self.cell.with(|value| self.schedule_save(value));
    }

    /// Returns true if the value differs from the one loaded at construction
    pub fn changed_since_init(&self) -> bool {
        self.cell.with(|value| *value != self.initial)
    }

    /// Deletes the record and resets the value to the initial one
    pub fn remove(&self) {
        self.remove_with(self.initial.clone());
    }

    /// Deletes the record and resets the value to `replacement`
    ///
    /// Saves queued before the call are applied first, so the record is gone
    /// when this returns. The reset itself is not saved.
    ///
    /// The delete is queued and the replacement stored under one cell lock, so
    /// a concurrent change either lands before both or is saved after the
    /// delete. Waiting happens after the lock is released.
    pub fn remove_with(&self, replacement: T) {
        let (deleted, _) = self.cell.set_after(replacement, |_| {
            self.queue.delete_acked(self.saver.store(), self.key.clone())
        });
        let _ = deleted.recv();
    }

    /// Registers a listener called with each new value
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        self.cell.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.cell.unsubscribe(id)
    }

    pub fn store(&self) -> &Arc<PersistenceStore> {
        self.saver.store()
    }

    /// Blocks until queued saves have reached the store
    pub fn flush(&self) {
        self.queue.flush();
    }

    /// Tears the value down, running the dispose-time save check
    pub fn dispose(self) {
        drop(self);
    }
}

impl<T: Clone + PartialEq> Drop for Saveable<T> {
    fn drop(&mut self) {
        if self.policy == SavePolicy::OnDispose && self.changed_since_init() {
            tracing::debug!(key = %self.key, "saving on dispose");
            self.save_now();
        }
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for Saveable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saveable")
            .field("key", &self.key)
            .field("policy", &self.policy)
            .field("value", &self.cell)
            .finish_non_exhaustive()
    }
}
