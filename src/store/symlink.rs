//! Filesystem primitives for the store and the project trees.

use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;

use super::paths::LinkTarget;
use crate::error::Error;
use crate::runtime::Runtime;

pub struct SymlinkStore<'a, R: Runtime> {
    runtime: &'a R,
}

impl<'a, R: Runtime> SymlinkStore<'a, R> {
    pub fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Create `link` pointing at `target` unless a symlink is already there.
    /// Returns whether a link was created.
    #[tracing::instrument(skip(self))]
    pub fn ensure_symlink_exists(&self, target: &LinkTarget, link: &Path) -> Result<bool> {
        if self.runtime.is_symlink(link) {
            debug!("Symlink {:?} already exists", link);
            return Ok(false);
        }

        if let Some(parent) = link.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime
                .create_dir_all(parent)
                .context(Error::filesystem("create the directory", parent))?;
        }

        let value = target.link_value(link);
        self.runtime
            .symlink(&value, link)
            .context(Error::filesystem("create the symlink", link))?;

        info!("Linked {} -> {}", link.display(), value.display());
        Ok(true)
    }

    /// Point `link` at `target`, replacing a symlink that points elsewhere.
    /// Returns whether the link changed.
    #[tracing::instrument(skip(self))]
    pub fn refresh_symlink(&self, target: &LinkTarget, link: &Path) -> Result<bool> {
        if self.runtime.is_symlink(link) {
            let value = target.link_value(link);
            match self.runtime.read_link(link) {
                Ok(existing) if existing.components().eq(value.components()) => {
                    debug!("Symlink {:?} is up to date", link);
                    return Ok(false);
                }
                Ok(existing) => {
                    debug!("Symlink {:?} points to {:?}, replacing", link, existing);
                }
                Err(e) => {
                    debug!("Symlink {:?} is unreadable ({}), replacing", link, e);
                }
            }
            self.remove_symlink(link)?;
        }

        self.ensure_symlink_exists(target, link)
    }

    /// Remove `path` if it is a symlink. Returns whether something was removed.
    #[tracing::instrument(skip(self))]
    pub fn remove_symlink(&self, path: &Path) -> Result<bool> {
        if !self.runtime.is_symlink(path) {
            return Ok(false);
        }

        self.runtime
            .remove_symlink(path)
            .context(Error::filesystem("remove the symlink", path))?;
        info!("Removed symlink {}", path.display());
        Ok(true)
    }

    /// Remove `path` if it is an empty directory. Returns whether it was removed.
    #[tracing::instrument(skip(self))]
    pub fn remove_empty_directory(&self, path: &Path) -> Result<bool> {
        if self.runtime.is_symlink(path) || !self.runtime.is_dir(path) {
            return Ok(false);
        }

        let entries = self
            .runtime
            .read_dir(path)
            .context(Error::filesystem("read the directory", path))?;
        if !entries.is_empty() {
            return Ok(false);
        }

        self.runtime
            .remove_dir(path)
            .context(Error::filesystem("remove the directory", path))?;
        debug!("Removed empty directory {:?}", path);
        Ok(true)
    }

    /// Recursively copy `source` to `destination`, merging into existing
    /// directories. Nested symlinks are copied as symlinks.
    #[tracing::instrument(skip(self))]
    pub fn copy(&self, source: &Path, destination: &Path) -> Result<()> {
        if self.runtime.is_symlink(source) {
            let value = self
                .runtime
                .read_link(source)
                .context(Error::filesystem("read the symlink", source))?;
            self.remove_symlink(destination)?;
            self.ensure_parent(destination)?;
            self.runtime
                .symlink(&value, destination)
                .context(Error::filesystem("create the symlink", destination))?;
            return Ok(());
        }

        if self.runtime.is_dir(source) {
            self.runtime
                .create_dir_all(destination)
                .context(Error::filesystem("create the directory", destination))?;

            let entries = self
                .runtime
                .read_dir(source)
                .context(Error::filesystem("read the directory", source))?;
            for entry in entries {
                let Some(name) = entry.file_name() else {
                    continue;
                };
                self.copy(&entry, &destination.join(name))?;
            }
            return Ok(());
        }

        self.remove_symlink(destination)?;
        self.ensure_parent(destination)?;
        self.runtime
            .copy(source, destination)
            .context(Error::filesystem("copy the file", source))?;
        Ok(())
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !self.runtime.is_dir(parent)
        {
            self.runtime
                .create_dir_all(parent)
                .context(Error::filesystem("create the directory", parent))?;
        }
        Ok(())
    }
}
