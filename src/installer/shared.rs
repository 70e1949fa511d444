//! Lifecycle of shared packages: one source in the store, one symlink per
//! project, and a ledger of which projects use which source.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::{DirectoryConfig, lock_path};
use crate::host::{InstalledRepository, LibraryInstaller};
use crate::package::Package;
use crate::runtime::{FileLock, Runtime};
use crate::store::{
    PathResolver, SourceSlot, StoreLedgers, SymlinkStore, UsageLedger, VendorLink, last_reference,
};

/// What to do when a shared source is about to lose its last reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfirmPolicy {
    /// Ask on the terminal.
    #[default]
    Ask,
    AssumeYes,
    AssumeNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Updated in place; both versions share a slot.
    Updated,
    /// Different slots: the caller must uninstall the initial package and
    /// install the target as two separate operations.
    Reinstall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    SourceDeleted,
    SourceRetained,
}

/// Shared-package operations the router dispatches to.
#[cfg_attr(test, mockall::automock)]
pub trait SharedOperations {
    fn install_path(&self, package: &Package) -> PathBuf;
    fn is_installed(&self, repo: &InstalledRepository, package: &Package) -> bool;
    fn install(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()>;
    fn update(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
    ) -> Result<UpdateOutcome>;
    fn uninstall(
        &self,
        repo: &mut InstalledRepository,
        package: &Package,
    ) -> Result<UninstallOutcome>;
}

pub struct SharedInstaller<'a, R: Runtime, L: UsageLedger> {
    runtime: &'a R,
    config: &'a DirectoryConfig,
    ledgers: StoreLedgers<L>,
    library: LibraryInstaller<'a, R>,
    confirm: ConfirmPolicy,
}

impl<'a, R: Runtime, L: UsageLedger> SharedInstaller<'a, R, L> {
    pub fn new(
        runtime: &'a R,
        config: &'a DirectoryConfig,
        ledgers: StoreLedgers<L>,
        confirm: ConfirmPolicy,
    ) -> Self {
        Self {
            runtime,
            config,
            ledgers,
            library: LibraryInstaller::new(runtime, config),
            confirm,
        }
    }

    fn ledger(&self, package: &Package) -> &L {
        self.ledgers.for_package(package)
    }

    fn resolver(&self) -> PathResolver<'a> {
        PathResolver::new(self.config)
    }

    fn store(&self) -> SymlinkStore<'a, R> {
        SymlinkStore::new(self.runtime)
    }

    /// Lock the store roots holding the slots of `packages`, in path order.
    fn lock(&self, packages: &[&Package]) -> Result<Vec<FileLock>> {
        let resolver = self.resolver();
        let roots: BTreeSet<&Path> = packages
            .iter()
            .map(|package| resolver.store_root(package))
            .collect();

        roots
            .into_iter()
            .map(|root| {
                let path = lock_path(root);
                debug!("Waiting for store lock {:?}", path);
                self.runtime
                    .lock_exclusive(&path)
                    .with_context(|| format!("Failed to lock the shared store at {:?}", root))
            })
            .collect()
    }

    fn vendor_link(&self, package: &Package) -> VendorLink {
        VendorLink::new(self.resolver().symlink_path(package))
    }

    fn confirm_delete(&self, package: &Package, slot: &SourceSlot) -> Result<bool> {
        match self.confirm {
            ConfirmPolicy::AssumeYes => Ok(true),
            ConfirmPolicy::AssumeNo => Ok(false),
            ConfirmPolicy::Ask => self.runtime.confirm(&format!(
                "No other project uses {}. Delete its shared source at {}?",
                package,
                slot.path().display()
            )),
        }
    }
}

impl<R: Runtime, L: UsageLedger> SharedOperations for SharedInstaller<'_, R, L> {
    fn install_path(&self, package: &Package) -> PathBuf {
        self.resolver().install_path(package)
    }

    fn is_installed(&self, repo: &InstalledRepository, package: &Package) -> bool {
        let resolver = self.resolver();

        if !repo.has_package(package) {
            return false;
        }
        if !self.runtime.is_readable(&resolver.install_path(package)) {
            return false;
        }
        // Packages without a managed symlink are complete without one
        if resolver.exposes_via_symlink(package) {
            let link = resolver.symlink_path(package);
            return self.runtime.is_symlink(&link) && self.runtime.exists(&link);
        }
        true
    }

    #[tracing::instrument(skip(self, repo, package), fields(package = %package))]
    fn install(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()> {
        let _locks = self.lock(&[package])?;
        let resolver = self.resolver();
        let slot = SourceSlot::new(package.id(), resolver.install_path(package));

        if !slot.is_populated(self.runtime) {
            self.library.install_at(repo, package, slot.path())?;
        } else if !repo.has_package(package) {
            info!(
                "Reusing shared source of {} at {}",
                package,
                slot.path().display()
            );
            repo.add_package(package);
            self.library.install_binaries(package, slot.path())?;
        } else {
            debug!("{} is already in place", package);
        }

        if resolver.exposes_via_symlink(package) {
            self.vendor_link(package)
                .ensure(&self.store(), &resolver.symlink_source(package))?;
        }

        self.ledger(package)
            .add_usage(&package.id(), &self.config.project_id)
    }

    #[tracing::instrument(skip(self, repo, initial, target), fields(initial = %initial, target = %target))]
    fn update(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
    ) -> Result<UpdateOutcome> {
        let _locks = self.lock(&[initial, target])?;
        self.ledger(initial).set_installation_source(initial)?;
        self.ledger(target).set_installation_source(target)?;

        let resolver = self.resolver();
        let path = resolver.install_path(target);
        if resolver.install_path(initial) != path {
            debug!("{} and {} live in different slots", initial, target);
            return Ok(UpdateOutcome::Reinstall);
        }

        if resolver.exposes_via_symlink(target) {
            self.vendor_link(target)
                .refresh(&self.store(), &resolver.symlink_source(target))?;
        }
        self.library.update_at(repo, initial, target, &path)?;

        let (from, to) = (initial.id(), target.id());
        if from != to {
            self.ledger(initial)
                .remove_usage(&from, &self.config.project_id)?;
            self.ledger(target).add_usage(&to, &self.config.project_id)?;
        }

        Ok(UpdateOutcome::Updated)
    }

    #[tracing::instrument(skip(self, repo, package), fields(package = %package))]
    fn uninstall(
        &self,
        repo: &mut InstalledRepository,
        package: &Package,
    ) -> Result<UninstallOutcome> {
        let _locks = self.lock(&[package])?;
        let ledger = self.ledger(package);
        ledger.set_installation_source(package)?;

        let id = package.id();
        let slot = SourceSlot::new(id.clone(), self.resolver().install_path(package));
        // Decided before this project's usage is removed
        let last = last_reference(ledger, &id)?;

        if self.config.symlink_enabled {
            self.vendor_link(package).remove(&self.store())?;
        }

        let outcome = match last {
            Some(token) if self.confirm_delete(package, &slot)? => {
                slot.delete_with(token, |path| self.library.uninstall_at(repo, package, path))?;
                UninstallOutcome::SourceDeleted
            }
            _ => {
                info!(
                    "Keeping shared source of {} at {}",
                    package,
                    slot.path().display()
                );
                self.library.remove_binaries(package)?;
                repo.remove_package(package);
                UninstallOutcome::SourceRetained
            }
        };

        ledger.remove_usage(&id, &self.config.project_id)?;
        Ok(outcome)
    }
}
