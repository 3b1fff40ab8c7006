//! Persisted ordered sequence
//!
//! Every mutation builds the next whole `Vec` and commits it through
//! [`Saveable::update`], so list edits follow exactly the same change
//! detection and save rules as scalar values. Reads go straight to the
//! current value.

use std::ops::{Deref, Range};

use super::saveable::Saveable;

pub struct SaveableList<T: Clone + PartialEq> {
    state: Saveable<Vec<T>>,
}

impl<T: Clone + PartialEq> SaveableList<T> {
    pub fn new(state: Saveable<Vec<T>>) -> Self {
        Self { state }
    }

    /// Returns the underlying saveable
    pub fn state(&self) -> &Saveable<Vec<T>> {
        &self.state
    }

    pub fn into_state(self) -> Saveable<Vec<T>> {
        self.state
    }

    /// Tears the value down, running the dispose-time save check
    pub fn dispose(self) {
        self.state.dispose();
    }

    pub fn len(&self) -> usize {
        self.state.with_value(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.state.with_value(Vec::is_empty)
    }

    pub fn get(&self, index: usize) -> Option<T> {
        self.state.with_value(|items| items.get(index).cloned())
    }

    pub fn contains(&self, item: &T) -> bool {
        self.state.with_value(|items| items.contains(item))
    }

    pub fn contains_all(&self, items: &[T]) -> bool {
        self.state
            .with_value(|current| items.iter().all(|item| current.contains(item)))
    }

    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.state
            .with_value(|items| items.iter().position(|x| x == item))
    }

    pub fn last_index_of(&self, item: &T) -> Option<usize> {
        self.state
            .with_value(|items| items.iter().rposition(|x| x == item))
    }

    /// Returns a copy of the items
    pub fn to_vec(&self) -> Vec<T> {
        self.state.value()
    }

    /// Returns a copy of the items in `range`, or `None` if it is out of bounds
    pub fn slice(&self, range: Range<usize>) -> Option<Vec<T>> {
        self.state
            .with_value(|items| items.get(range).map(<[T]>::to_vec))
    }

    pub fn push(&self, item: T) {
        self.state.update(|items| items.push(item));
    }

    /// Inserts `item` at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.state.update(|items| items.insert(index, item));
    }

    pub fn extend(&self, items: impl IntoIterator<Item = T>) {
        self.state.update(|current| current.extend(items));
    }

    /// Inserts all `items` starting at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_all(&self, index: usize, items: impl IntoIterator<Item = T>) {
        self.state.update(|current| {
            let tail = current.split_off(index);
            current.extend(items);
            current.extend(tail);
        });
    }

    /// Removes and returns the item at `index`; out of range is a no-op
    pub fn remove_at(&self, index: usize) -> Option<T> {
        self.state.update(|items| (index < items.len()).then(|| items.remove(index)))
    }

    /// Replaces the item at `index`, returning the old one; out of range is a
    /// no-op
    pub fn set(&self, index: usize, item: T) -> Option<T> {
        self.state.update(|items| {
            items
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, item))
        })
    }

    /// Removes every item equal to `item`, returning true if any was removed
    pub fn remove_item(&self, item: &T) -> bool {
        self.retain(|x| x != item)
    }

    /// Removes every item contained in `items`
    pub fn remove_all(&self, items: &[T]) -> bool {
        self.retain(|x| !items.contains(x))
    }

    /// Keeps only items contained in `items`
    pub fn retain_all(&self, items: &[T]) -> bool {
        self.retain(|x| items.contains(x))
    }

    /// Keeps only items matching `keep`, returning true if any was removed
    ///
    /// `keep` runs under the value lock, like [`Saveable::update`], and must
    /// not access this list.
    pub fn retain(&self, mut keep: impl FnMut(&T) -> bool) -> bool {
        self.state.update(|items| {
            let before = items.len();
            items.retain(|x| keep(x));
            items.len() != before
        })
    }

    pub fn clear(&self) {
        self.state.set_value(Vec::new());
    }

    pub fn replace_all(&self, items: impl IntoIterator<Item = T>) {
        self.state.set_value(items.into_iter().collect());
    }
}

impl<T: Clone + PartialEq> Deref for SaveableList<T> {
    type Target = Saveable<Vec<T>>;

    fn deref(&self) -> &Self::Target {
        &self.state
    }
}
