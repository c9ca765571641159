//! Bundle installation beneath the virtual root.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tempfile::NamedTempFile;

use sideload_types::CodeBundle;

use crate::SearchPath;

/// Directory the interpreter's loader searches for delivered packages.
pub const DEFAULT_VIRTUAL_ROOT: &str = "/sideload_pkgs";

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// A bundle entry's content was not valid base64.
    #[error("invalid base64 in bundle entry '{path}'")]
    Decode {
        path: String,
        #[source]
        source: base64::DecodeError,
    },
    /// A bundle entry's relative path would land outside the virtual root.
    #[error("bundle entry '{path}' escapes the virtual root")]
    PathEscapesRoot { path: String },
    /// Filesystem failure creating or writing beneath the root.
    #[error("writing '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Materializes code bundles beneath the virtual root.
///
/// The root directory, once created and registered on the search path, is
/// never removed for the life of the process.
#[derive(Debug, Clone)]
pub struct Installer {
    root: PathBuf,
    search_path: SearchPath,
}

impl Installer {
    pub fn new(root: impl Into<PathBuf>, search_path: SearchPath) -> Self {
        Self {
            root: root.into(),
            search_path,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Create the virtual root (and parents) if absent, then register it on
    /// the search path if not already present. Idempotent.
    pub fn ensure_root(&self) -> Result<(), InstallError> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|source| InstallError::Io {
                path: self.root.clone(),
                source,
            })?;
        }
        if self.search_path.append_unique(&self.root) {
            tracing::info!(
                "registered {} on the module search path",
                self.root.display()
            );
        }
        Ok(())
    }

    /// Decode and write every bundle entry beneath the virtual root.
    ///
    /// Entries are validated and decoded before any file is written, so a
    /// bad entry leaves the tree untouched. Writes follow the bundle's own
    /// order; parent directories are created on demand and existing files
    /// are overwritten. Returns the number of files written.
    pub fn install(&self, bundle: &CodeBundle) -> Result<usize, InstallError> {
        let mut staged = Vec::with_capacity(bundle.len());
        for (relpath, encoded) in bundle.iter() {
            let dest = self.resolve(relpath)?;
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|source| InstallError::Decode {
                    path: relpath.to_owned(),
                    source,
                })?;
            staged.push((dest, bytes));
        }

        for (dest, bytes) in &staged {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|source| InstallError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            write_atomic(dest, bytes).map_err(|source| InstallError::Io {
                path: dest.clone(),
                source,
            })?;
        }

        tracing::debug!(
            "installed {} files under {}",
            staged.len(),
            self.root.display()
        );
        Ok(staged.len())
    }

    /// Join `relpath` onto the root, rejecting entries that would land
    /// outside it (absolute paths, traversal, bare directories).
    fn resolve(&self, relpath: &str) -> Result<PathBuf, InstallError> {
        let rel = Path::new(relpath);
        let escapes = rel.is_absolute()
            || rel.file_name().is_none()
            || rel.components().any(|component| {
                matches!(component, Component::ParentDir | Component::Prefix(_))
            });
        if escapes {
            return Err(InstallError::PathEscapesRoot {
                path: relpath.to_owned(),
            });
        }
        Ok(self.root.join(rel))
    }
}

/// Temp file in the destination directory, then rename into place, so a
/// crash mid-write never leaves a torn file at the final path.
fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
