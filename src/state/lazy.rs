//! Saveables whose key is bound on first access
//!
//! A [`LazySaveable`] is built before its key is known: typically it is a field
//! of some owner type and the key comes from that type plus the field name.
//! The first [`bind`](LazySaveable::bind) derives the key, loads the record and
//! caches the result; later calls return the cached binding whatever they pass.
//! Lazily bound values always save immediately.

use std::fmt;
use std::sync::OnceLock;

use super::saveable::Saveable;
use crate::domain::{Key, KeyError, SavePolicy};
use crate::storage::{SaveQueue, Saver};

pub struct LazySaveable<T: Clone + PartialEq> {
    explicit: Option<Key>,
    default: T,
    saver: Saver<T>,
    queue: SaveQueue,
    bound: OnceLock<Saveable<T>>,
}

impl<T: Clone + PartialEq> LazySaveable<T> {
    /// Creates an unbound value whose key will be derived on first access
    pub fn new(default: T, saver: Saver<T>, queue: SaveQueue) -> Self {
        Self {
            explicit: None,
            default,
            saver,
            queue,
            bound: OnceLock::new(),
        }
    }

    /// Creates an unbound value with a fixed key; owner and name passed to
    /// [`bind`](Self::bind) are ignored
    pub fn with_key(key: Key, default: T, saver: Saver<T>, queue: SaveQueue) -> Self {
        Self {
            explicit: Some(key),
            ..Self::new(default, saver, queue)
        }
    }

    /// Binds to the record for `owner`'s type and `name`, loading it on the
    /// first call
    pub fn bind<O: ?Sized>(&self, owner: Option<&O>, name: &str) -> Result<&Saveable<T>, KeyError> {
        if let Some(bound) = self.bound.get() {
            return Ok(bound);
        }

        let key = match &self.explicit {
            Some(key) => key.clone(),
            None => Key::derive(owner, name)?,
        };

        Ok(self.bound.get_or_init(|| {
            Saveable::open(
                key,
                self.default.clone(),
                SavePolicy::Immediate,
                self.saver.clone(),
                self.queue.clone(),
            )
        }))
    }

    /// Returns the binding, if [`bind`](Self::bind) has run
    pub fn get(&self) -> Option<&Saveable<T>> {
        self.bound.get()
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Returns the bound key, if any
    pub fn key(&self) -> Option<&Key> {
        self.bound.get().map(Saveable::key)
    }

    /// Binds if needed and returns the current value
    pub fn get_value<O: ?Sized>(&self, owner: Option<&O>, name: &str) -> Result<T, KeyError> {
        Ok(self.bind(owner, name)?.value())
    }

    /// Binds if needed and sets the value
    pub fn set_value<O: ?Sized>(&self, owner: Option<&O>, name: &str, value: T) -> Result<bool, KeyError> {
        Ok(self.bind(owner, name)?.set_value(value))
    }
}

impl<T: Clone + PartialEq + fmt::Debug> fmt::Debug for LazySaveable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySaveable")
            .field("explicit", &self.explicit)
            .field("bound", &self.bound.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::JsonCodec;
    use crate::storage::PersistenceStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Settings {
        theme: LazySaveable<String>,
        font: LazySaveable<String>,
    }

    impl Settings {
        fn new(store: &Arc<PersistenceStore>, queue: &SaveQueue) -> Self {
            let saver = Saver::new(store.clone(), JsonCodec::<String>::new());
            Self {
                theme: LazySaveable::new("light".to_string(), saver.clone(), queue.clone()),
                font: LazySaveable::new("mono".to_string(), saver, queue.clone()),
            }
        }

        fn theme(&self) -> &Saveable<String> {
            self.theme.bind(Some(self), "theme").unwrap()
        }

        fn font(&self) -> &Saveable<String> {
            self.font.bind(Some(self), "font").unwrap()
        }
    }

    #[test]
    fn binds_lazily_and_caches() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PersistenceStore::new(dir.path()));
        let settings = Settings::new(&store, &SaveQueue::new());

        assert!(!settings.theme.is_bound());
        assert_eq!(settings.theme().value(), "light");
        assert!(settings.theme.is_bound());

        let key = settings.theme.key().unwrap().clone();
        assert!(key.as_str().ends_with("Settings:theme"));

        // Later binds keep the first key
        let again = settings.theme.bind(None::<&()>, "other").unwrap();
        assert_eq!(again.key(), &key);
    }

    #[test]
    fn instances_of_one_type_share_a_record() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PersistenceStore::new(dir.path()));
        let queue = SaveQueue::new();

        let first = Settings::new(&store, &queue);
        first.theme().set_value("dark".to_string());
        queue.flush();

        let second = Settings::new(&store, &queue);
        assert_eq!(second.theme().value(), "dark");
        assert_eq!(first.theme().key(), second.theme().key());
        assert_ne!(second.theme().key(), second.font().key());
        assert_eq!(second.font().value(), "mono");
    }

    #[test]
    fn explicit_key_overrides_derivation() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PersistenceStore::new(dir.path()));
        let saver = Saver::new(store.clone(), JsonCodec::<u32>::new());
        let queue = SaveQueue::new();
        let lazy = LazySaveable::with_key(Key::new("volume").unwrap(), 5, saver, queue.clone());

        assert!(lazy.set_value(Some(&Settings::new(&store, &queue)), "ignored", 9).unwrap());
        queue.flush();

        assert_eq!(lazy.key().unwrap().as_str(), "volume");
        assert_eq!(store.load(&Key::new("volume").unwrap()), Some(b"9".to_vec()));
    }

    #[test]
    fn no_owner_uses_bare_name() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(PersistenceStore::new(dir.path()));
        let saver = Saver::new(store, JsonCodec::<u32>::new());
        let lazy = LazySaveable::new(1, saver, SaveQueue::new());

        assert_eq!(lazy.get_value(None::<&()>, "launches").unwrap(), 1);
        assert_eq!(lazy.key().unwrap().as_str(), "launches");
    }

    #[test]
    fn invalid_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        let saver = Saver::new(Arc::new(PersistenceStore::new(dir.path())), JsonCodec::<u32>::new());
        let lazy = LazySaveable::new(1, saver, SaveQueue::new());

        assert_eq!(lazy.bind(None::<&()>, "").unwrap_err(), KeyError::Empty);
        assert!(!lazy.is_bound());
    }
}
