//! datasaver - Observable values that persist themselves
//!
//! A value (scalar, list, or map) lives in memory as an observable cell bound
//! to one record on disk. The record is read once when the value is created;
//! changes are written back through a pluggable codec, either right away or
//! when the value is dropped.
//!
//! ```no_run
//! use datasaver::{JsonCodec, Key, Persistence, SavePolicy};
//!
//! datasaver::storage::root::configure("/tmp/values").unwrap();
//! let persistence = Persistence::global();
//!
//! let count = persistence.state(Key::new("count").unwrap(), 0u32, SavePolicy::Immediate, JsonCodec::new());
//! count.set_value(5);
//! persistence.flush();
//! ```

pub mod domain;
pub mod storage;
pub mod state;
pub mod cli;

pub use domain::{Codec, CodecError, FnCodec, JsonCodec, Key, KeyError, Optional, SavePolicy};
pub use state::{LazySaveable, Persistence, Saveable, SaveableList, SaveableMap};
pub use storage::{PersistenceStore, SaveQueue, Saver};
