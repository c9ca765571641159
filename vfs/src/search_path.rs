//! Module-resolution search path shared with the embedded interpreter.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide, append-only list of directories the interpreter's module
/// loader consults.
///
/// Entries are only ever appended, never removed, for the life of the
/// process. Cloning shares the underlying list, so the installer and the
/// interpreter binding observe the same state.
#[derive(Debug, Clone, Default)]
pub struct SearchPath {
    entries: Arc<Mutex<Vec<PathBuf>>>,
}

impl SearchPath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `dir` is already registered, compared by value.
    #[must_use]
    pub fn contains(&self, dir: &Path) -> bool {
        self.lock().iter().any(|entry| entry == dir)
    }

    /// Append `dir` unless it is already present.
    ///
    /// Returns whether the entry was appended. The check is by value, not a
    /// side-channel flag, so re-registration is a no-op.
    pub fn append_unique(&self, dir: &Path) -> bool {
        let mut entries = self.lock();
        if entries.iter().any(|entry| entry == dir) {
            return false;
        }
        entries.push(dir.to_path_buf());
        true
    }

    /// Current entries in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        // Appends cannot panic mid-mutation, so a poisoned lock still holds
        // a consistent list.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
