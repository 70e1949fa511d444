use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::package::Package;
use crate::runtime::{Runtime, relative_symlink_path};

/// Links a package's executables into the project's bin directory.
pub struct BinaryInstaller<'a, R: Runtime> {
    runtime: &'a R,
    bin_dir: PathBuf,
}

impl<'a, R: Runtime> BinaryInstaller<'a, R> {
    pub fn new(runtime: &'a R, bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            bin_dir: bin_dir.into(),
        }
    }

    fn link_path(&self, binary: &str) -> Option<PathBuf> {
        Path::new(binary)
            .file_name()
            .map(|name| self.bin_dir.join(name))
    }

    /// (Re)create the executable links of `package` installed at `package_root`.
    #[tracing::instrument(skip(self, package), fields(package = %package))]
    pub fn install(&self, package: &Package, package_root: &Path) -> Result<()> {
        if !package.has_binaries() {
            return Ok(());
        }

        self.runtime
            .create_dir_all(&self.bin_dir)
            .context(Error::filesystem("create the directory", &self.bin_dir))?;

        for binary in &package.binaries {
            let Some(link) = self.link_path(binary) else {
                warn!("Skipping executable {:?} of {}", binary, package);
                continue;
            };
            let source = package_root.join(binary);

            if self.runtime.is_symlink(&link) {
                self.runtime
                    .remove_symlink(&link)
                    .context(Error::filesystem("remove the symlink", &link))?;
            }

            let value = relative_symlink_path(&link, &source).unwrap_or_else(|| source.clone());
            self.runtime
                .symlink(&value, &link)
                .context(Error::filesystem("create the symlink", &link))?;

            if self.runtime.exists(&source) {
                self.runtime.set_permissions(&source, 0o755)?;
            }
            debug!("Linked executable {:?} -> {:?}", link, value);
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, package), fields(package = %package))]
    pub fn remove(&self, package: &Package) -> Result<()> {
        for binary in &package.binaries {
            let Some(link) = self.link_path(binary) else {
                continue;
            };

            if self.runtime.is_symlink(&link) {
                self.runtime
                    .remove_symlink(&link)
                    .context(Error::filesystem("remove the symlink", &link))?;
                debug!("Removed executable link {:?}", link);
            }
        }

        Ok(())
    }
}
