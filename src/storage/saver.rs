//! Typed access to a byte store through a codec

use std::fmt;
use std::sync::Arc;

use super::{PersistenceStore, StoreEvent};
use crate::domain::{Codec, CodecError, Key};

/// A store paired with a codec for values of type `T`
pub struct Saver<T> {
    store: Arc<PersistenceStore>,
    codec: Arc<dyn Codec<T>>,
}

impl<T> Clone for Saver<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            codec: self.codec.clone(),
        }
    }
}

impl<T> Saver<T> {
    pub fn new(store: Arc<PersistenceStore>, codec: impl Codec<T> + 'static) -> Self {
        Self {
            store,
            codec: Arc::new(codec),
        }
    }

    pub fn store(&self) -> &Arc<PersistenceStore> {
        &self.store
    }

    /// Encodes `value`, reporting an encode failure against `key`
    pub fn encode(&self, key: &Key, value: &T) -> Option<Vec<u8>> {
        match self.codec.encode(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.store.report(StoreEvent::WriteFailed {
                    key: key.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Returns true if the codec treats `value` as "no value"
    pub fn is_absent(&self, value: &T) -> bool {
        self.codec.is_absent(value)
    }

    /// Writes `value` synchronously; absent values delete the record
    pub fn save_data(&self, key: &Key, value: &T) {
        if self.is_absent(value) {
            self.store.delete(key);
            return;
        }

        if let Some(bytes) = self.encode(key, value) {
            self.store.save(key, &bytes);
        }
    }

    /// Decodes the stored record, if there is one
    pub fn try_read_data(&self, key: &Key) -> Option<Result<T, CodecError>> {
        self.store.load(key).map(|bytes| self.codec.decode(&bytes))
    }

    /// Reads the value for `key`, falling back to `default` when the record is
    /// missing, unreadable, or fails to decode
    pub fn read_data(&self, key: &Key, default: T) -> T {
        match self.try_read_data(key) {
            Some(Ok(value)) => value,
            Some(Err(e)) => {
                self.store.report(StoreEvent::DecodeFailed {
                    key: key.clone(),
                    error: e.to_string(),
                });
                default
            }
            None => default,
        }
    }

    /// Deletes the record for `key`
    pub fn remove(&self, key: &Key) {
        self.store.delete(key);
    }
}

impl<T> fmt::Debug for Saver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saver").field("store", &self.store).finish()
    }
}
