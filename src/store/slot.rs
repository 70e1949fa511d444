//! The two resources behind a shared package.
//!
//! A [`VendorLink`] belongs to one project and can be removed freely. A
//! [`SourceSlot`] is shared by every project in the ledger; deleting it
//! consumes a [`LastReference`] obtained from the ledger.

use anyhow::{Result, bail};
use log::info;
use std::path::{Path, PathBuf};

use super::ledger::LastReference;
use super::paths::LinkTarget;
use super::symlink::SymlinkStore;
use crate::package::PackageId;
use crate::runtime::Runtime;

/// A project's symlink into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorLink {
    path: PathBuf,
}

impl VendorLink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure<R: Runtime>(&self, store: &SymlinkStore<'_, R>, target: &LinkTarget) -> Result<bool> {
        store.ensure_symlink_exists(target, &self.path)
    }

    pub fn refresh<R: Runtime>(&self, store: &SymlinkStore<'_, R>, target: &LinkTarget) -> Result<bool> {
        store.refresh_symlink(target, &self.path)
    }

    /// Remove the link, then its parent directory if that is left empty.
    pub fn remove<R: Runtime>(self, store: &SymlinkStore<'_, R>) -> Result<bool> {
        let removed = store.remove_symlink(&self.path)?;
        if removed && let Some(parent) = self.path.parent() {
            store.remove_empty_directory(parent)?;
        }
        Ok(removed)
    }
}

/// A package version's source directory in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSlot {
    id: PackageId,
    path: PathBuf,
}

impl SourceSlot {
    pub fn new(id: PackageId, path: impl Into<PathBuf>) -> Self {
        Self {
            id,
            path: path.into(),
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The slot holds a source this process can read.
    pub fn is_populated<R: Runtime>(&self, runtime: &R) -> bool {
        runtime.is_readable(&self.path)
    }

    /// Delete the source with `delete`. The token must be for this slot's package.
    pub fn delete_with<F>(self, token: LastReference, delete: F) -> Result<()>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        if token.id() != &self.id {
            bail!(
                "Refusing to delete {:?}: last-reference token is for {}, not {}",
                self.path,
                token.id(),
                self.id
            );
        }

        delete(&self.path)?;
        info!("Deleted shared source of {} at {}", self.id, self.path.display());
        Ok(())
    }
}
