//! # Storage Layer
//!
//! Byte-level persistence of keyed records under one root directory.
//!
//! ## Layout
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Values | Codec-defined bytes | `{root}/{key}` |
//! | In-flight writes | Same | `{root}/.{fingerprint}.tmp` |
//! | Config | TOML | `~/.config/datasaver/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`PersistenceStore`] guards all keys with one reader/writer lock and
//!   `fs2` file locks
//! - All writes are atomic (temp file + rename)
//! - [`SaveQueue`] applies background writes in submission order
//!
//! ## Key Types
//!
//! - [`PersistenceStore`] - Save/load/delete raw bytes by key
//! - [`Saver`] - A store plus a codec for one value type
//! - [`SaveQueue`] - Background FIFO writer
//! - [`Config`] - User configuration
//! - [`root`] - Process-wide storage root

mod config;
mod queue;
pub mod root;
mod saver;
mod store;

pub use config::{Config, ConfigError, ROOT_ENV};
pub use queue::SaveQueue;
pub use root::RootError;
pub use saver::Saver;
pub use store::{
    fingerprint, DiagnosticHook, EntryInfo, PersistenceStore, StoreError, StoreEvent,
};
