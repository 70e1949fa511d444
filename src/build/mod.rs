//! Materializes installed packages into the build-output tree.
//!
//! Each deployable package gets one entry under the build base: the build
//! root is copied there, every other package is linked.

use anyhow::Result;
use log::{debug, info};
use std::path::PathBuf;

use crate::config::DirectoryConfig;
use crate::host::Installer;
use crate::package::Package;
use crate::runtime::Runtime;
use crate::store::{LinkTarget, SymlinkStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialized {
    /// Host-internal or not selected by any deploy rule.
    Skipped,
    /// The build root, copied into the build base.
    Copied { destination: PathBuf },
    Linked { destination: PathBuf, created: bool },
}

pub struct BuildTreeMaterializer<'a, R: Runtime> {
    runtime: &'a R,
    config: &'a DirectoryConfig,
}

impl<'a, R: Runtime> BuildTreeMaterializer<'a, R> {
    pub fn new(runtime: &'a R, config: &'a DirectoryConfig) -> Self {
        Self { runtime, config }
    }

    #[tracing::instrument(skip(self, package, installer), fields(package = %package))]
    pub fn on_package_installed<I: Installer + ?Sized>(
        &self,
        package: &Package,
        installer: &I,
    ) -> Result<Materialized> {
        if package.is_host_internal() {
            return Ok(Materialized::Skipped);
        }

        let Some(relative) = self.config.deploy_paths.resolve(package)? else {
            debug!("No deploy rule for {}", package);
            return Ok(Materialized::Skipped);
        };

        let source = installer.install_path(package);
        let store = SymlinkStore::new(self.runtime);

        if self.config.build_root.as_deref() == Some(package.name.as_str()) {
            let destination = self.config.build.base.clone();
            info!(
                "Copying build root {} into {}",
                package,
                destination.display()
            );
            store.copy(&source, &destination)?;
            return Ok(Materialized::Copied { destination });
        }

        let destination = self.config.build.base.join(relative);
        let created = store.ensure_symlink_exists(&LinkTarget::Local(source), &destination)?;
        Ok(Materialized::Linked {
            destination,
            created,
        })
    }
}
