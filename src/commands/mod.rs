//! Use cases behind the CLI subcommands.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::config::{BuildMode, DirectoryConfig, ledger_path};
use crate::host::{InstalledRepository, LibraryInstaller};
use crate::installer::{ConfirmPolicy, InstallRouter, SharedInstaller};
use crate::package::Package;
use crate::runtime::Runtime;
use crate::store::{JsonUsageLedger, StoreLedgers};

mod install;
mod paths;
mod status;
mod uninstall;
mod update;
mod usage;

pub use install::install;
pub use paths::paths;
pub use status::status;
pub use uninstall::uninstall;
pub use update::update;
pub use usage::usage;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Options {
    pub project_dir: PathBuf,
    pub mode: BuildMode,
    pub confirm: ConfirmPolicy,
}

impl Options {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            mode: BuildMode::Dev,
            confirm: ConfirmPolicy::Ask,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_confirm(mut self, confirm: ConfirmPolicy) -> Self {
        self.confirm = confirm;
        self
    }
}

pub type ProjectRouter<'a, R> =
    InstallRouter<'a, SharedInstaller<'a, R, JsonUsageLedger<'a, R>>, LibraryInstaller<'a, R>>;

/// Wire the router for one project.
pub fn router<'a, R: Runtime>(
    runtime: &'a R,
    config: &'a DirectoryConfig,
    confirm: ConfirmPolicy,
) -> ProjectRouter<'a, R> {
    let ledgers = StoreLedgers::new(
        JsonUsageLedger::new(runtime, ledger_path(&config.store_dir)),
        JsonUsageLedger::new(runtime, ledger_path(&config.shared_vendor_dir)),
    );
    InstallRouter::new(
        &config.matcher,
        SharedInstaller::new(runtime, config, ledgers, confirm),
        LibraryInstaller::new(runtime, config),
    )
}

fn load_config<R: Runtime>(runtime: &R, options: &Options) -> Result<DirectoryConfig> {
    DirectoryConfig::load(runtime, &options.project_dir, options.mode)
}

fn load_repository<R: Runtime>(runtime: &R, config: &DirectoryConfig) -> Result<InstalledRepository> {
    let path = InstalledRepository::default_path(&config.build.vendor);
    debug!("Using local record {:?}", path);
    InstalledRepository::load(runtime, &path)
}

fn load_packages<R: Runtime>(runtime: &R, descriptors: &[PathBuf]) -> Result<Vec<Package>> {
    descriptors
        .iter()
        .map(|path| load_package(runtime, path))
        .collect()
}

fn load_package<R: Runtime>(runtime: &R, path: &Path) -> Result<Package> {
    Package::load(runtime, path).with_context(|| format!("Failed to load package {:?}", path))
}

/// Save the local record whether or not `result` is an error, then return `result`.
fn save_after<R: Runtime, T>(
    runtime: &R,
    repo: &InstalledRepository,
    result: Result<T>,
) -> Result<T> {
    let saved = repo.save(runtime);
    let value = result?;
    saved?;
    Ok(value)
}
