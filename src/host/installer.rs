use anyhow::{Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};

use super::binaries::BinaryInstaller;
use super::repository::InstalledRepository;
use crate::config::DirectoryConfig;
use crate::error::Error;
use crate::package::Package;
use crate::runtime::Runtime;
use crate::store::SymlinkStore;

/// The install interface the host drives for every package.
#[cfg_attr(test, mockall::automock)]
pub trait Installer {
    fn install_path(&self, package: &Package) -> PathBuf;
    fn is_installed(&self, repo: &InstalledRepository, package: &Package) -> bool;
    fn install(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()>;
    fn update(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
    ) -> Result<()>;
    fn uninstall(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()>;
}

/// Default installer: copies a package from its distribution directory
/// into the project and links its executables.
pub struct LibraryInstaller<'a, R: Runtime> {
    runtime: &'a R,
    config: &'a DirectoryConfig,
}

impl<'a, R: Runtime> LibraryInstaller<'a, R> {
    pub fn new(runtime: &'a R, config: &'a DirectoryConfig) -> Self {
        Self { runtime, config }
    }

    fn store(&self) -> SymlinkStore<'a, R> {
        SymlinkStore::new(self.runtime)
    }

    fn binaries(&self) -> BinaryInstaller<'a, R> {
        BinaryInstaller::new(self.runtime, &self.config.shared_bin_dir)
    }

    fn dist<'p>(&self, package: &'p Package) -> Result<&'p Path> {
        package
            .dist
            .as_deref()
            .with_context(|| format!("{} has no distribution directory to install from", package))
    }

    /// Copy `package` into `path`, link its executables and record it.
    #[tracing::instrument(skip(self, repo, package), fields(package = %package))]
    pub fn install_at(
        &self,
        repo: &mut InstalledRepository,
        package: &Package,
        path: &Path,
    ) -> Result<()> {
        let dist = self.dist(package)?;
        info!("Installing {} into {}", package, path.display());

        self.store().copy(dist, path)?;
        self.binaries().install(package, path)?;
        repo.add_package(package);
        Ok(())
    }

    /// Replace the files at `path` with `target`'s.
    #[tracing::instrument(skip(self, repo, initial, target), fields(initial = %initial, target = %target))]
    pub fn update_at(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
        path: &Path,
    ) -> Result<()> {
        let dist = self.dist(target)?;
        info!("Updating {} to {} in {}", initial, target, path.display());

        self.binaries().remove(initial)?;
        self.remove_files(path)?;
        self.store().copy(dist, path)?;
        self.binaries().install(target, path)?;

        repo.remove_package(initial);
        repo.add_package(target);
        Ok(())
    }

    /// Remove `package`'s files at `path`, its executables and its record.
    #[tracing::instrument(skip(self, repo, package), fields(package = %package))]
    pub fn uninstall_at(
        &self,
        repo: &mut InstalledRepository,
        package: &Package,
        path: &Path,
    ) -> Result<()> {
        self.binaries().remove(package)?;
        self.remove_files(path)?;
        if let Some(parent) = path.parent() {
            self.store().remove_empty_directory(parent)?;
        }
        repo.remove_package(package);
        Ok(())
    }

    /// Re-link executables of a package whose files are already in place.
    pub fn install_binaries(&self, package: &Package, path: &Path) -> Result<()> {
        self.binaries().install(package, path)
    }

    pub fn remove_binaries(&self, package: &Package) -> Result<()> {
        self.binaries().remove(package)
    }

    fn remove_files(&self, path: &Path) -> Result<()> {
        if self.runtime.is_symlink(path) {
            self.runtime
                .remove_symlink(path)
                .context(Error::filesystem("remove the symlink", path))?;
        } else if self.runtime.is_dir(path) {
            self.runtime
                .remove_dir_all(path)
                .context(Error::filesystem("remove the directory", path))?;
        } else if self.runtime.exists(path) {
            self.runtime
                .remove_file(path)
                .context(Error::filesystem("remove the file", path))?;
        } else {
            debug!("Nothing to remove at {:?}", path);
        }
        Ok(())
    }
}

impl<R: Runtime> Installer for LibraryInstaller<'_, R> {
    fn install_path(&self, package: &Package) -> PathBuf {
        let path = self.config.symlink_dir.join(&package.name);
        match package.target_dir.as_deref() {
            Some(target) if !target.is_empty() => path.join(target),
            _ => path,
        }
    }

    fn is_installed(&self, repo: &InstalledRepository, package: &Package) -> bool {
        repo.has_package(package) && self.runtime.exists(&self.install_path(package))
    }

    fn install(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()> {
        let path = self.install_path(package);
        self.install_at(repo, package, &path)
    }

    fn update(
        &self,
        repo: &mut InstalledRepository,
        initial: &Package,
        target: &Package,
    ) -> Result<()> {
        let initial_path = self.install_path(initial);
        let target_path = self.install_path(target);

        if initial_path == target_path {
            return self.update_at(repo, initial, target, &target_path);
        }

        self.uninstall_at(repo, initial, &initial_path)?;
        self.install_at(repo, target, &target_path)
    }

    fn uninstall(&self, repo: &mut InstalledRepository, package: &Package) -> Result<()> {
        let path = self.install_path(package);
        self.uninstall_at(repo, package, &path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildMode, EnvOverrides, ProjectManifest};
    use crate::runtime::RealRuntime;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        dir: TempDir,
        config: DirectoryConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let config = DirectoryConfig::from_manifest(
                &ProjectManifest::default(),
                &dir.path().join("app"),
                BuildMode::Dev,
                &EnvOverrides::default(),
                None,
            )
            .unwrap();
            Self { dir, config }
        }

        fn dist(&self, name: &str, files: &[(&str, &str)]) -> PathBuf {
            let root = self.dir.path().join("dist").join(name);
            for (file, content) in files {
                let path = root.join(file);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(path, content).unwrap();
            }
            root
        }
    }

    #[test]
    fn test_install_update_uninstall() {
        let fixture = Fixture::new();
        let runtime = RealRuntime;
        let installer = LibraryInstaller::new(&runtime, &fixture.config);
        let mut repo = InstalledRepository::new(fixture.dir.path().join("installed.json"));

        let v1 = Package::new("acme/lib", "1.0.0")
            .with_dist(fixture.dist("lib-1", &[("src/Lib.php", "v1"), ("old.txt", "x")]));
        let v2 = Package::new("acme/lib", "2.0.0")
            .with_dist(fixture.dist("lib-2", &[("src/Lib.php", "v2")]));

        let path = installer.install_path(&v1);
        assert_eq!(path, fixture.dir.path().join("app/vendor/acme/lib"));

        installer.install(&mut repo, &v1).unwrap();
        assert!(installer.is_installed(&repo, &v1));
        assert_eq!(std::fs::read_to_string(path.join("src/Lib.php")).unwrap(), "v1");

        installer.update(&mut repo, &v1, &v2).unwrap();
        assert!(!repo.has_package(&v1));
        assert!(installer.is_installed(&repo, &v2));
        assert_eq!(std::fs::read_to_string(path.join("src/Lib.php")).unwrap(), "v2");
        assert!(!path.join("old.txt").exists());

        installer.uninstall(&mut repo, &v2).unwrap();
        assert!(!repo.has_package(&v2));
        assert!(!path.exists());
        assert!(!fixture.dir.path().join("app/vendor/acme").exists());
    }

    #[test]
    fn test_install_without_dist_fails() {
        let fixture = Fixture::new();
        let runtime = RealRuntime;
        let installer = LibraryInstaller::new(&runtime, &fixture.config);
        let mut repo = InstalledRepository::new(fixture.dir.path().join("installed.json"));

        let result = installer.install(&mut repo, &Package::new("acme/lib", "1.0.0"));
        assert!(result.is_err());
        assert!(repo.packages().is_empty());
    }

    #[test]
    fn test_is_installed_needs_files_and_record() {
        let fixture = Fixture::new();
        let runtime = RealRuntime;
        let installer = LibraryInstaller::new(&runtime, &fixture.config);
        let mut repo = InstalledRepository::new(fixture.dir.path().join("installed.json"));
        let package = Package::new("acme/lib", "1.0.0");

        repo.add_package(&package);
        assert!(!installer.is_installed(&repo, &package));

        std::fs::create_dir_all(installer.install_path(&package)).unwrap();
        assert!(installer.is_installed(&repo, &package));
    }
}
