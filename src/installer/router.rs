use anyhow::Result;
use log::{debug, info};
use std::path::PathBuf;

use super::shared::{SharedOperations, UninstallOutcome, UpdateOutcome};
use crate::error::Error;
use crate::host::{InstalledRepository, Installer};
use crate::package::{Package, PackageMatcher};

/// Sends each package to the shared installer or the default one.
pub struct InstallRouter<'a, S: SharedOperations, D: Installer> {
    matcher: &'a PackageMatcher,
    shared: S,
    default: D,
}

impl<'a, S: SharedOperations, D: Installer> InstallRouter<'a, S, D> {
    pub fn new(matcher: &'a PackageMatcher, shared: S, default: D) -> Self {
        Self {
            matcher,
            shared,
            default,
        }
    }

    pub fn is_shared(&self, package: &Package) -> bool {
        self.matcher.is_shared(package)
    }

    pub fn shared(&self) -> &S {
        &self.shared
    }

    fn require_recorded(repo: &InstalledRepository, package: &Package) -> Result<()> {
        if repo.has_package(package) {
            Ok(())
        } else {
            Err(Error::not_installed(package).into())
        }
    }
}

impl<S: SharedOperations, D: Installer> Installer for InstallRouter<'_, S, D> {
    fn install_path(&self, package: &Package) -> PathBuf {
        if self.is_shared(package) {
            self.shared.install_path(package)
        } else {
            self.default.install_path(package)
        }
    }

    fn is_installed(&self, repo: &InstalledRepository, package: &Package) -> bool {
        if self.is_shared(package) {
            self.shared.is_installed(repo, package)
        } else {
            self.default.is_installed(repo, package)
        }
    }

    fn install(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()> {
        if self.is_shared(package) {
            debug!("Installing {} into the shared store", package);
            self.shared.install(repo, package)
        } else {
            self.default.install(repo, package)
        }
    }

    fn update(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
    ) -> Result<()> {
        if !self.is_shared(initial) && !self.is_shared(target) {
            return self.default.update(repo, initial, target);
        }

        Self::require_recorded(repo, initial)?;
        match self.shared.update(repo, initial, target)? {
            UpdateOutcome::Updated => Ok(()),
            UpdateOutcome::Reinstall => {
                debug!("Replacing {} with {}", initial, target);
                self.uninstall(repo, initial)?;
                self.install(repo, target)
            }
        }
    }

    fn uninstall(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()> {
        if !self.is_shared(package) {
            return self.default.uninstall(repo, package);
        }

        Self::require_recorded(repo, package)?;
        match self.shared.uninstall(repo, package)? {
            UninstallOutcome::SourceDeleted => info!("Uninstalled {}", package),
            UninstallOutcome::SourceRetained => {
                info!("Uninstalled {} (shared source kept)", package)
            }
        }
        Ok(())
    }
}
