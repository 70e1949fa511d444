//! Advisory file locks.
//!
//! Used to serialize read-modify-write cycles on state that several
//! independent processes may touch at once (the shared store ledger).

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use super::RealRuntime;

/// An exclusive lock held until dropped.
pub struct FileLock {
    file: Option<File>,
    path: PathBuf,
}

impl FileLock {
    /// A guard that holds no OS lock. Used by runtimes without a real filesystem.
    pub fn detached(path: impl Into<PathBuf>) -> Self {
        Self {
            file: None,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("path", &self.path)
            .field("held", &self.is_held())
            .finish()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(e) = FileExt::unlock(&file) {
                warn!("Failed to unlock {}: {}", self.path.display(), e);
            } else {
                debug!("Released lock {}", self.path.display());
            }
        }
    }
}

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn lock_exclusive_impl(&self, path: &Path) -> Result<FileLock> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create lock directory {}", parent.display())
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("Failed to open lock file {}", path.display()))?;

        FileExt::lock_exclusive(&file)
            .with_context(|| format!("Failed to acquire lock {}", path.display()))?;
        debug!("Acquired lock {}", path.display());

        Ok(FileLock {
            file: Some(file),
            path: path.to_path_buf(),
        })
    }
}
