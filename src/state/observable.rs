//! Observable value cell
//!
//! A value holder with change listeners. Listeners run on the thread that made
//! the change, after the cell lock has been released, and only when the new
//! value differs from the old one.
//!
//! Because notification happens outside the lock, two threads changing the
//! cell at once may notify in the opposite order to their commits. The value
//! passed to a listener is the one that thread committed, not necessarily the
//! latest; listeners that need the current value should read the cell, as
//! [`Observable::get`] always reflects the last commit.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockWriteGuard};

/// Handle returned by [`Observable::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct Observable<T> {
    value: RwLock<T>,
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone + PartialEq> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Returns a copy of the current value
    pub fn get(&self) -> T {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs `f` against the current value without copying it
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the value, returning true if it changed
    pub fn set(&self, value: T) -> bool {
        self.set_with(value, |_| ()).is_some()
    }

    /// Replaces the value and, if it changed, runs `on_change` with the new
    /// value while the cell is still locked
    ///
    /// Holding the lock makes `on_change` calls follow the order of the writes
    /// themselves. Listeners are notified afterwards.
    pub fn set_with<R>(&self, value: T, on_change: impl FnOnce(&T) -> R) -> Option<R> {
        let current = self.value.write().unwrap_or_else(PoisonError::into_inner);
        self.commit(current, value, on_change)
    }

    /// Computes the next value from a copy of the current one, then commits it
    /// like [`Observable::set_with`]
    ///
    /// The read and the write happen under one lock, so concurrent
    /// modifications never lose each other's changes.
    pub fn modify_with<R, S>(
        &self,
        f: impl FnOnce(&mut T) -> R,
        on_change: impl FnOnce(&T) -> S,
    ) -> (R, Option<S>) {
        let current = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (*current).clone();
        let result = f(&mut next);
        (result, self.commit(current, next, on_change))
    }

    /// Runs `before` against the current value, then replaces it, all under
    /// one write lock
    ///
    /// Returns `before`'s result and whether the value changed.
    pub fn set_after<R>(&self, value: T, before: impl FnOnce(&T) -> R) -> (R, bool) {
        let current = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let result = before(&*current);
        (result, self.commit(current, value, |_| ()).is_some())
    }

    fn commit<R>(
        &self,
        mut current: RwLockWriteGuard<'_, T>,
        value: T,
        on_change: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        if *current == value {
            *current = value;
            return None;
        }

        *current = value;
        let result = on_change(&*current);
        let snapshot = self.has_listeners().then(|| (*current).clone());
        drop(current);

        if let Some(value) = snapshot {
            self.notify(&value);
        }

        Some(result)
    }

    /// Registers a listener called with each new value
    ///
    /// Under concurrent writers the calls are not ordered; see the module docs.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener, returning false if it was not registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn has_listeners(&self) -> bool {
        !self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    fn notify(&self, value: &T) {
        let listeners: Vec<Listener<T>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read().unwrap_or_else(PoisonError::into_inner))
            .finish_non_exhaustive()
    }
}
