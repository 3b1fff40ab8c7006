//! Storage access for one CLI invocation
//!
//! Resolves the storage root, pins it as the process root and opens a store
//! whose failures are collected instead of only logged, so commands can turn
//! them into a non-zero exit.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Context, Result};

use crate::domain::{JsonCodec, Key, SavePolicy};
use crate::state::{Persistence, Saveable};
use crate::storage::{root, Config, PersistenceStore, SaveQueue, StoreEvent};

pub struct Session {
    config: Config,
    persistence: Persistence,
    failures: Arc<Mutex<Vec<StoreEvent>>>,
}

impl Session {
    /// Opens the session over `root_override`, or the configured root
    pub fn open(root_override: Option<PathBuf>, config_path: Option<&Path>) -> Result<Self> {
        let config = load_config(config_path)?;
        let root_dir = match root_override {
            Some(dir) => dir,
            None => config.storage_root()?,
        };

        root::configure(root_dir.clone())?;
        tracing::debug!(root = %root_dir.display(), "session opened");

        let failures: Arc<Mutex<Vec<StoreEvent>>> = Arc::default();
        let sink = failures.clone();
        let store = PersistenceStore::new(root::get()).with_diagnostics(Arc::new(move |event: &StoreEvent| {
            // A corrupt record is replaced by the write that follows, so only
            // I/O failures abort the command
            if event.is_failure() && !matches!(event, StoreEvent::DecodeFailed { .. }) {
                sink.lock().unwrap_or_else(PoisonError::into_inner).push(event.clone());
            }
        }));

        Ok(Self {
            config,
            persistence: Persistence::new(Arc::new(store), SaveQueue::new()),
            failures,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn root(&self) -> &Path {
        self.persistence.store().root()
    }

    pub fn store(&self) -> &Arc<PersistenceStore> {
        self.persistence.store()
    }

    /// Opens the JSON value stored under `key`
    pub fn value(&self, key: Key, policy: SavePolicy) -> Saveable<serde_json::Value> {
        self.persistence
            .state(key, serde_json::Value::Null, policy, JsonCodec::new())
    }

    /// Waits for queued writes and fails if any store operation failed
    pub fn finish(&self) -> Result<()> {
        self.persistence.flush();

        let failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(event) = failures.first() {
            bail!(
                "Storage operation on '{}' failed: {}",
                event.key(),
                event.error().unwrap_or("unknown error")
            );
        }

        Ok(())
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Config::load(),
    }
}
