use std::path::{Path, PathBuf};

use crate::config::DirectoryConfig;
use crate::package::Package;
use crate::runtime::relative_symlink_path;

/// What a project symlink points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// A path on this machine; the link stores it relative to its own location.
    Local(PathBuf),
    /// A rewritten path (e.g. a guest-side mount) stored exactly as given.
    Verbatim(PathBuf),
}

impl LinkTarget {
    /// The value written into a symlink placed at `link`.
    pub fn link_value(&self, link: &Path) -> PathBuf {
        match self {
            LinkTarget::Local(target) => {
                relative_symlink_path(link, target).unwrap_or_else(|| target.clone())
            }
            LinkTarget::Verbatim(target) => target.clone(),
        }
    }
}

/// Maps packages to their locations for one project.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    config: &'a DirectoryConfig,
}

impl<'a> PathResolver<'a> {
    pub fn new(config: &'a DirectoryConfig) -> Self {
        Self { config }
    }

    /// Executables and patched sources need a version-stable, name-only location.
    pub fn uses_name_slot(package: &Package) -> bool {
        (package.has_binaries() || package.is_patched()) && !package.is_host_internal()
    }

    pub fn install_path(&self, package: &Package) -> PathBuf {
        let base = if Self::uses_name_slot(package) {
            self.config.shared_vendor_dir.join(&package.name)
        } else {
            self.config
                .original
                .vendor
                .join(format!("{}-{}", package.name, package.version))
        };

        with_target_dir(base, package)
    }

    /// Store root holding `package`'s slot. Its ledger and lock guard the slot.
    pub fn store_root(&self, package: &Package) -> &'a Path {
        if Self::uses_name_slot(package) {
            &self.config.shared_vendor_dir
        } else {
            &self.config.store_dir
        }
    }

    pub fn symlink_path(&self, package: &Package) -> PathBuf {
        self.config.symlink_dir.join(&package.name)
    }

    pub fn symlink_source(&self, package: &Package) -> LinkTarget {
        match &self.config.symlink_base_path {
            Some(base) => LinkTarget::Verbatim(with_target_dir(
                Path::new(base).join(format!("{}-{}", package.name, package.version)),
                package,
            )),
            None => LinkTarget::Local(self.install_path(package)),
        }
    }

    /// Whether the project sees `package` through a symlink it owns.
    pub fn exposes_via_symlink(&self, package: &Package) -> bool {
        self.config.symlink_enabled
            && !package.has_binaries()
            && self.install_path(package) != self.symlink_path(package)
    }
}

fn with_target_dir(base: PathBuf, package: &Package) -> PathBuf {
    match package.target_dir.as_deref() {
        Some(target) if !target.is_empty() => base.join(target),
        _ => base,
    }
}
