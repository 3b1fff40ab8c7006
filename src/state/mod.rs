//! In-memory values bound to persisted records
//!
//! | Type | Value |
//! |------|-------|
//! | [`Saveable`] | any `T: Clone + PartialEq` |
//! | [`SaveableList`] | `Vec<T>` with list-style edits |
//! | [`SaveableMap`] | `BTreeMap<K, V>` with map-style edits |
//! | [`LazySaveable`] | a `Saveable` whose key is bound on first access |
//!
//! [`Persistence`] builds all of them over one store and save queue.

mod lazy;
mod list;
mod map;
mod observable;
mod persistence;
mod saveable;

pub use lazy::LazySaveable;
pub use list::SaveableList;
pub use map::SaveableMap;
pub use observable::{Observable, SubscriptionId};
pub use persistence::Persistence;
pub use saveable::Saveable;
