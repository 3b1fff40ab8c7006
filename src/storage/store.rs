//! Keyed byte storage
//!
//! Each key is stored as one file directly under the store root. Writes go to
//! a `.{fingerprint}.tmp` sibling under an exclusive file lock and are renamed into
//! place, so a reader sees either the old bytes or the new bytes, never a mix.
//!
//! A single reader/writer lock per store covers every key: loads run
//! concurrently with each other, saves and deletes exclude everything else.
//! Values are small and writes rare, so per-key parallelism is not worth the
//! bookkeeping.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::Serialize;
use thiserror::Error;

use super::root;
use crate::domain::Key;

static GLOBAL: OnceLock<Arc<PersistenceStore>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Something a store did or failed to do
///
/// Failures are swallowed by [`PersistenceStore::save`], [`PersistenceStore::load`]
/// and [`PersistenceStore::delete`]; this is how they stay observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Saved { key: Key, len: usize },
    Deleted { key: Key },
    WriteFailed { key: Key, error: String },
    ReadFailed { key: Key, error: String },
    DeleteFailed { key: Key, error: String },
    DecodeFailed { key: Key, error: String },
}

impl StoreEvent {
    pub fn key(&self) -> &Key {
        match self {
            StoreEvent::Saved { key, .. }
            | StoreEvent::Deleted { key }
            | StoreEvent::WriteFailed { key, .. }
            | StoreEvent::ReadFailed { key, .. }
            | StoreEvent::DeleteFailed { key, .. }
            | StoreEvent::DecodeFailed { key, .. } => key,
        }
    }

    /// Returns true for the failure variants
    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }

    /// Returns the failure message, if this event is a failure
    pub fn error(&self) -> Option<&str> {
        match self {
            StoreEvent::Saved { .. } | StoreEvent::Deleted { .. } => None,
            StoreEvent::WriteFailed { error, .. }
            | StoreEvent::ReadFailed { error, .. }
            | StoreEvent::DeleteFailed { error, .. }
            | StoreEvent::DecodeFailed { error, .. } => Some(error),
        }
    }
}

/// Observer for [`StoreEvent`]s
pub type DiagnosticHook = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

/// Metadata about one stored record
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub key: Key,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    /// Short blake3 fingerprint of the record bytes
    pub digest: String,
}

/// Returns a 12-character blake3 fingerprint of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes);
    hash.to_hex()[..12].to_string()
}

/// Byte store rooted at one directory
pub struct PersistenceStore {
    root: PathBuf,
    lock: RwLock<()>,
    diagnostics: Option<DiagnosticHook>,
}

impl PersistenceStore {
    /// Creates a store over the given root directory
    ///
    /// The directory is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: RwLock::new(()),
            diagnostics: None,
        }
    }

    /// Returns the process-wide store over the configured root
    ///
    /// # Panics
    ///
    /// Panics if [`root::configure`] has not been called.
    pub fn global() -> Arc<Self> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::new(root::get())))
            .clone()
    }

    /// Installs an observer for store events
    pub fn with_diagnostics(mut self, hook: DiagnosticHook) -> Self {
        self.diagnostics = Some(hook);
        self
    }

    /// Returns the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path of the record for `key`
    pub fn path_for(&self, key: &Key) -> PathBuf {
        self.root.join(key.as_str())
    }

    /// Temp names stay short whatever the key length, so any key that fits
    /// the file-name limit can also be written
    fn temp_path_for(&self, key: &Key) -> PathBuf {
        self.root
            .join(format!(".{}.tmp", fingerprint(key.as_str().as_bytes())))
    }

    /// Writes `bytes` as the record for `key`, reporting instead of returning
    /// failures
    pub fn save(&self, key: &Key, bytes: &[u8]) {
        match self.try_save(key, bytes) {
            Ok(()) => self.report(StoreEvent::Saved {
                key: key.clone(),
                len: bytes.len(),
            }),
            Err(e) => self.report(StoreEvent::WriteFailed {
                key: key.clone(),
                error: e.to_string(),
            }),
        }
    }

    /// Writes `bytes` as the record for `key`, replacing any existing content
    pub fn try_save(&self, key: &Key, bytes: &[u8]) -> Result<(), StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(&self.root, e))?;

        let path = self.path_for(key);
        let temp_path = self.temp_path_for(key);

        let written = write_locked(&temp_path, bytes)
            .and_then(|()| fs::rename(&temp_path, &path).map_err(|e| StoreError::io(&path, e)));

        if written.is_err() {
            let _ = fs::remove_file(&temp_path);
        }

        written
    }

    /// Reads the record for `key`, treating any failure as absent
    pub fn load(&self, key: &Key) -> Option<Vec<u8>> {
        match self.try_load(key) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.report(StoreEvent::ReadFailed {
                    key: key.clone(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    /// Reads the record for `key`; `Ok(None)` if there is none
    pub fn try_load(&self, key: &Key) -> Result<Option<Vec<u8>>, StoreError> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);

        let path = self.path_for(key);
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        file.lock_shared().map_err(|e| StoreError::io(&path, e))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| StoreError::io(&path, e))?;

        // Lock is released when file is dropped
        Ok(Some(bytes))
    }

    /// Removes the record for `key`; a missing record is not an error
    pub fn delete(&self, key: &Key) {
        match self.try_delete(key) {
            Ok(true) => self.report(StoreEvent::Deleted { key: key.clone() }),
            Ok(false) => {}
            Err(e) => self.report(StoreEvent::DeleteFailed {
                key: key.clone(),
                error: e.to_string(),
            }),
        }
    }

    /// Removes the record for `key`, returning whether one existed
    pub fn try_delete(&self, key: &Key) -> Result<bool, StoreError> {
        let _guard = self.lock.write().unwrap_or_else(PoisonError::into_inner);

        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    /// Returns true if a record exists for `key`
    pub fn contains(&self, key: &Key) -> bool {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);
        self.path_for(key).is_file()
    }

    /// Lists stored keys in sorted order
    ///
    /// In-flight temp files and anything that is not a valid key are skipped.
    pub fn keys(&self) -> Result<Vec<Key>, StoreError> {
        let _guard = self.lock.read().unwrap_or_else(PoisonError::into_inner);

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.root, e)),
        };

        let mut keys: Vec<Key> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| e.file_name().to_str().and_then(|name| Key::new(name).ok()))
            .collect();

        keys.sort();
        Ok(keys)
    }

    /// Returns metadata about the record for `key`
    pub fn entry(&self, key: &Key) -> Result<Option<EntryInfo>, StoreError> {
        let path = self.path_for(key);
        let Some(bytes) = self.try_load(key)? else {
            return Ok(None);
        };

        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(Some(EntryInfo {
            key: key.clone(),
            size: bytes.len() as u64,
            modified,
            digest: fingerprint(&bytes),
        }))
    }

    /// Logs an event and hands it to the diagnostics hook
    pub fn report(&self, event: StoreEvent) {
        match &event {
            StoreEvent::Saved { key, len } => tracing::debug!(%key, len, "record saved"),
            StoreEvent::Deleted { key } => tracing::debug!(%key, "record deleted"),
            StoreEvent::WriteFailed { key, error } => {
                tracing::warn!(%key, %error, "failed to save record")
            }
            StoreEvent::ReadFailed { key, error } => {
                tracing::warn!(%key, %error, "failed to read record")
            }
            StoreEvent::DeleteFailed { key, error } => {
                tracing::warn!(%key, %error, "failed to delete record")
            }
            StoreEvent::DecodeFailed { key, error } => {
                tracing::warn!(%key, %error, "failed to decode record")
            }
        }

        if let Some(hook) = &self.diagnostics {
            hook(&event);
        }
    }
}

impl fmt::Debug for PersistenceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistenceStore")
            .field("root", &self.root)
            .field("diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

fn write_locked(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    file.lock_exclusive().map_err(|e| StoreError::io(path, e))?;

    let mut writer = BufWriter::new(&file);
    writer.write_all(bytes).map_err(|e| StoreError::io(path, e))?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;
    drop(writer);

    file.sync_data().map_err(|e| StoreError::io(path, e))
}
