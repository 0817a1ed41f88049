//! Durable storage for the bearer token.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session keeps exactly one persisted value: the current token, under the
//! fixed key [`TOKEN_KEY`]. The user record is never persisted; it is
//! re-fetched after a restart. Storage is assumed available, so I/O failures
//! are logged and otherwise ignored.

#[cfg(test)]
#[path = "token_persistence_test.rs"]
mod token_persistence_test;

use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Fixed key of the persisted token slot.
pub const TOKEN_KEY: &str = "token";

/// A single key-value slot holding the current token.
pub trait TokenStorage: Send + Sync {
    /// Read the persisted token, if any.
    fn load(&self) -> Option<String>;
    /// Replace the persisted token.
    fn save(&self, token: &str);
    /// Remove the persisted token. Clearing an empty slot is a no-op.
    fn clear(&self);
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// Token slot backed by a file named [`TOKEN_KEY`] inside a directory.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(TOKEN_KEY) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => normalize_token(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read persisted token");
                None
            }
        }
    }

    fn save(&self, token: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!(path = %parent.display(), error = %e, "failed to create token directory");
                return;
            }
        }
        if let Err(e) = std::fs::write(&self.path, token) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to persist token");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "failed to remove persisted token"),
        }
    }
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// In-process token slot; does not survive the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    slot: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `token`, as if written by an earlier run.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self { slot: Mutex::new(Some(token.into())) }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> Option<String> {
        self.slot.lock().as_deref().and_then(normalize_token)
    }

    fn save(&self, token: &str) {
        *self.slot.lock() = Some(token.to_owned());
    }

    fn clear(&self) {
        *self.slot.lock() = None;
    }
}

fn normalize_token(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
