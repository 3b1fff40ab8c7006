//! Process-wide storage root
//!
//! The root is configured once at startup, before the global store is used.
//! Reconfiguring to a different directory is refused; stores that need another
//! directory are built with [`PersistenceStore::new`](super::PersistenceStore::new).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use thiserror::Error;

static ROOT: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Error)]
pub enum RootError {
    #[error(
        "Storage root already configured at {}, refusing {}",
        .current.display(),
        .requested.display()
    )]
    AlreadyConfigured { current: PathBuf, requested: PathBuf },
}

/// Sets the process-wide storage root
///
/// Calling it again with the same path is a no-op.
pub fn configure(root: impl Into<PathBuf>) -> Result<(), RootError> {
    let requested = root.into();
    let current = ROOT.get_or_init(|| requested.clone());

    if *current != requested {
        return Err(RootError::AlreadyConfigured {
            current: current.clone(),
            requested,
        });
    }

    tracing::debug!(root = %current.display(), "storage root configured");
    Ok(())
}

/// Returns the configured root, if any
pub fn try_get() -> Option<&'static Path> {
    ROOT.get().map(PathBuf::as_path)
}

/// Returns the configured root
///
/// # Panics
///
/// Panics if [`configure`] has not been called. Using the global store before
/// configuring it is a programming error with no sane fallback.
pub fn get() -> &'static Path {
    match try_get() {
        Some(root) => root,
        None => panic!("datasaver storage root is not configured; call storage::root::configure first"),
    }
}

/// Returns true once a root has been configured
pub fn is_configured() -> bool {
    ROOT.get().is_some()
}
