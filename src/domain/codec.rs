//! Value codecs
//!
//! A [`Codec`] turns a value into the bytes of its record and back. The storage
//! engine never looks inside those bytes: forward and backward compatibility of
//! the encoded form is entirely the codec's business.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode value: {0}")]
    Encode(String),

    #[error("Failed to decode value: {0}")]
    Decode(String),
}

/// Encode/decode pair for values of type `T`
pub trait Codec<T>: Send + Sync {
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Returns true if `value` stands for "no value"
    ///
    /// Saving an absent value deletes the record instead of writing it.
    fn is_absent(&self, _value: &T) -> bool {
        false
    }
}

impl<T, C> Codec<T> for Arc<C>
where
    C: Codec<T> + ?Sized,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        (**self).encode(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (**self).decode(bytes)
    }

    fn is_absent(&self, value: &T) -> bool {
        (**self).is_absent(value)
    }
}

/// JSON codec backed by serde
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

type EncodeFn<T> = dyn Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync;
type DecodeFn<T> = dyn Fn(&[u8]) -> Result<T, CodecError> + Send + Sync;

/// Codec built from a pair of closures
pub struct FnCodec<T> {
    encode: Box<EncodeFn<T>>,
    decode: Box<DecodeFn<T>>,
}

impl<T> FnCodec<T> {
    pub fn new<E, D>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync + 'static,
        D: Fn(&[u8]) -> Result<T, CodecError> + Send + Sync + 'static,
    {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T> Codec<T> for FnCodec<T> {
    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, CodecError> {
        (self.decode)(bytes)
    }
}

/// Lifts a codec for `T` to `Option<T>`, treating `None` as absent
pub struct Optional<C> {
    inner: C,
}

impl<C> Optional<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Codec<Option<T>> for Optional<C>
where
    C: Codec<T>,
{
    fn encode(&self, value: &Option<T>) -> Result<Vec<u8>, CodecError> {
        match value {
            Some(v) => self.inner.encode(v),
            None => Err(CodecError::Encode("absent value has no encoding".to_string())),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Option<T>, CodecError> {
        self.inner.decode(bytes).map(Some)
    }

    fn is_absent(&self, value: &Option<T>) -> bool {
        value.is_none()
    }
}
