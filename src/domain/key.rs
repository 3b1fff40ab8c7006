//! Storage keys
//!
//! A [`Key`] names one persisted value and doubles as the file name of its
//! record directly under the storage root.
//!
//! Key Format:
//! - Explicit keys: any caller-chosen name (e.g., `count`)
//! - Derived keys: `{owner-type}:{name}` (e.g., `app::Settings:theme`)
//! - Derived keys without an owner: `{name}`
//!
//! The owner part identifies the declaring *type*, never the instance, so every
//! instance of the same type/property pair shares one record.
//!
//! Keys are limited to [`MAX_KEY_LEN`] bytes, the usual file-name limit.
//! Derived keys contain `:`, which NTFS reads as an alternate data stream
//! separator, so derived keys are only usable on Unix-like file systems;
//! Windows callers should pass explicit keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest key in bytes
pub const MAX_KEY_LEN: usize = 255;

#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("Key must not be empty")]
    Empty,

    #[error("Invalid key '{0}': keys cannot contain path separators or NUL")]
    InvalidChar(String),

    #[error("Invalid key '{0}': keys cannot start with '.'")]
    Reserved(String),

    #[error("Key is {0} bytes long, the limit is {max}", max = MAX_KEY_LEN)]
    TooLong(usize),
}

/// Validated storage key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key(String);

impl Key {
    /// Creates a key from an explicit name
    pub fn new(name: impl Into<String>) -> Result<Self, KeyError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Derives a key from the declaring type of `owner` and a property name
    ///
    /// `owner` is only used for its type; pass `None::<&()>` when there is no
    /// enclosing context and the key is the bare property name.
    pub fn derive<O: ?Sized>(owner: Option<&O>, name: &str) -> Result<Self, KeyError> {
        let owner_type = owner.map(|_| std::any::type_name::<O>());
        Self::derive_named(owner_type, name)
    }

    /// String-level form of [`Key::derive`] for callers that already hold a
    /// type identity
    pub fn derive_named(owner_type: Option<&str>, name: &str) -> Result<Self, KeyError> {
        match owner_type {
            Some(owner) => Self::new(format!("{}:{}", owner, name)),
            None => Self::new(name),
        }
    }

    /// Returns the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), KeyError> {
    if name.is_empty() {
        return Err(KeyError::Empty);
    }

    if name.chars().any(|c| matches!(c, '/' | '\\' | '\0')) {
        return Err(KeyError::InvalidChar(name.to_string()));
    }

    if name.len() > MAX_KEY_LEN {
        return Err(KeyError::TooLong(name.len()));
    }

    // Also rules out "." and ".."
    if name.starts_with('.') {
        return Err(KeyError::Reserved(name.to_string()));
    }

    Ok(())
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Key {
    type Error = KeyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Settings;
    struct Profile;

    #[test]
    fn explicit_key() {
        let key = Key::new("count").unwrap();
        assert_eq!(key.as_str(), "count");
        assert_eq!(key.to_string(), "count");
    }

    #[test]
    fn rejects_invalid_keys() {
        assert_eq!(Key::new(""), Err(KeyError::Empty));
        assert!(matches!(Key::new("a/b"), Err(KeyError::InvalidChar(_))));
        assert!(matches!(Key::new("a\\b"), Err(KeyError::InvalidChar(_))));
        assert!(matches!(Key::new("a\0b"), Err(KeyError::InvalidChar(_))));
        assert!(matches!(Key::new("."), Err(KeyError::Reserved(_))));
        assert!(matches!(Key::new(".."), Err(KeyError::Reserved(_))));
        assert!(matches!(Key::new(".count.tmp"), Err(KeyError::Reserved(_))));
    }

    #[test]
    fn length_limit_is_in_bytes() {
        assert!(Key::new("k".repeat(MAX_KEY_LEN)).is_ok());
        assert_eq!(Key::new("k".repeat(MAX_KEY_LEN + 1)), Err(KeyError::TooLong(256)));

        // 128 two-byte chars are 256 bytes
        assert_eq!(Key::new("é".repeat(128)), Err(KeyError::TooLong(256)));
    }

    #[test]
    fn derive_without_owner_is_bare_name() {
        let key = Key::derive(None::<&Settings>, "theme").unwrap();
        assert_eq!(key.as_str(), "theme");
    }

    #[test]
    fn derive_is_per_type_not_per_instance() {
        let a = Settings;
        let b = Settings;

        let key_a = Key::derive(Some(&a), "theme").unwrap();
        let key_b = Key::derive(Some(&b), "theme").unwrap();

        assert_eq!(key_a, key_b);
        assert!(key_a.as_str().ends_with("Settings:theme"));
    }

    #[test]
    fn derive_distinguishes_names_and_types() {
        let settings = Settings;
        let profile = Profile;

        let theme = Key::derive(Some(&settings), "theme").unwrap();
        let font = Key::derive(Some(&settings), "font").unwrap();
        let other = Key::derive(Some(&profile), "theme").unwrap();

        assert_ne!(theme, font);
        assert_ne!(theme, other);
    }

    #[test]
    fn derive_named_matches_format() {
        let key = Key::derive_named(Some("app::Settings"), "theme").unwrap();
        assert_eq!(key.as_str(), "app::Settings:theme");
    }

    #[test]
    fn serde_roundtrip() {
        let key = Key::new("count").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"count\"");

        let parsed: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);

        assert!(serde_json::from_str::<Key>("\"a/b\"").is_err());
    }

    proptest! {
        #[test]
        fn derived_keys_are_stable(name in "[a-zA-Z_][a-zA-Z0-9_]{0,24}") {
            let first = Key::derive(Some(&Settings), &name).unwrap();
            let second = Key::derive(Some(&Settings), &name).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
