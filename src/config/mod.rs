//! Project directory configuration.
//!
//! [`DirectoryConfig`] is resolved once per run from the project manifest,
//! the current git branch and two environment overrides. Everything that
//! computes paths afterwards is a pure function of it.

mod deploy;
mod manifest;
mod template;

pub use deploy::{DeployPaths, DeployRule};
pub use manifest::{MANIFEST_FILE, PerMode, ProjectManifest};
pub use template::{current_branch, render_template};

use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::package::{PackageMatcher, SelectionMode};
use crate::runtime::{Runtime, normalize_path};

pub const ENV_VENDOR_DIR: &str = "PKGSHARE_VENDOR_DIR";
pub const ENV_SYMLINK_BASE_PATH: &str = "PKGSHARE_SYMLINK_BASE_PATH";

/// Ledger file kept in each store root.
pub const LEDGER_FILE: &str = "packages.json";
/// Lock file serialising mutations of a store root between processes.
pub const LOCK_FILE: &str = ".pkgshare.lock";

pub fn ledger_path(store_root: &Path) -> PathBuf {
    store_root.join(LEDGER_FILE)
}

pub fn lock_path(store_root: &Path) -> PathBuf {
    store_root.join(LOCK_FILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    #[default]
    Dev,
    NoDev,
}

impl BuildMode {
    pub fn from_no_dev(no_dev: bool) -> Self {
        if no_dev { BuildMode::NoDev } else { BuildMode::Dev }
    }

    fn is_no_dev(self) -> bool {
        self == BuildMode::NoDev
    }
}

/// Base, vendor and bin directories, absolute and relative to the project.
#[derive(Debug, Clone, PartialEq)]
pub struct Directories {
    pub base: PathBuf,
    pub vendor: PathBuf,
    pub bin: PathBuf,
    pub relative_base: PathBuf,
    pub relative_vendor: PathBuf,
    pub relative_bin: PathBuf,
}

/// Environment overrides, read once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub vendor_dir: Option<String>,
    pub symlink_base_path: Option<String>,
}

impl EnvOverrides {
    #[tracing::instrument(skip(runtime))]
    pub fn from_runtime<R: Runtime>(runtime: &R) -> Self {
        let read = |key: &str| {
            runtime
                .env_var(key)
                .ok()
                .filter(|value| !value.is_empty())
                .map(|value| expand_home(runtime, value))
        };

        Self {
            vendor_dir: read(ENV_VENDOR_DIR),
            symlink_base_path: read(ENV_SYMLINK_BASE_PATH),
        }
    }
}

fn expand_home<R: Runtime>(runtime: &R, value: String) -> String {
    if let Some(rest) = value.strip_prefix("~/")
        && let Some(home) = runtime.home_dir()
    {
        return home.join(rest).to_string_lossy().into_owned();
    }
    value
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Layout declared by the manifest.
    pub original: Directories,
    /// Same layout under the build prefix.
    pub build: Directories,
    /// Where executable or patched shared packages are installed.
    pub shared_vendor_dir: PathBuf,
    pub shared_bin_dir: PathBuf,
    /// Where project symlinks live.
    pub symlink_dir: PathBuf,
    /// Replaces the symlink source prefix when set (host/guest path rewriting).
    pub symlink_base_path: Option<String>,
    pub symlink_enabled: bool,
    /// Package copied, not linked, into the build base.
    pub build_root: Option<String>,
    pub package_list: Vec<String>,
    pub selection: SelectionMode,
    pub matcher: PackageMatcher,
    pub deploy_paths: DeployPaths,
    /// Identifies this project in the usage ledger.
    pub project_id: String,
    /// Store root of version-qualified slots.
    pub store_dir: PathBuf,
}

impl DirectoryConfig {
    /// Resolve the configuration of the project at `project_dir`.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, project_dir: &Path, mode: BuildMode) -> Result<Self> {
        let project_dir = if project_dir.is_absolute() {
            normalize_path(project_dir)
        } else {
            normalize_path(&runtime.current_dir()?.join(project_dir))
        };

        let manifest = ProjectManifest::load(runtime, &project_dir)
            .with_context(|| format!("Failed to load the configuration of {:?}", project_dir))?;
        let overrides = EnvOverrides::from_runtime(runtime);
        let branch = current_branch(runtime, &project_dir);

        Self::from_manifest(&manifest, &project_dir, mode, &overrides, branch)
    }

    pub fn from_manifest(
        manifest: &ProjectManifest,
        project_dir: &Path,
        mode: BuildMode,
        overrides: &EnvOverrides,
        branch: Option<String>,
    ) -> Result<Self> {
        let original = Directories {
            base: project_dir.to_path_buf(),
            vendor: normalize_path(&project_dir.join(&manifest.vendor_dir)),
            bin: normalize_path(&project_dir.join(&manifest.bin_dir)),
            relative_base: PathBuf::new(),
            relative_vendor: PathBuf::from(&manifest.vendor_dir),
            relative_bin: PathBuf::from(&manifest.bin_dir),
        };

        let build_prefix = build_prefix(manifest, mode, branch)?;
        let build_base = if build_prefix.as_os_str().is_empty() {
            project_dir.to_path_buf()
        } else {
            project_dir.join(&build_prefix)
        };
        let build = Directories {
            vendor: normalize_path(&build_base.join(&manifest.vendor_dir)),
            bin: normalize_path(&build_base.join(&manifest.bin_dir)),
            base: build_base,
            relative_vendor: build_prefix.join(&manifest.vendor_dir),
            relative_bin: build_prefix.join(&manifest.bin_dir),
            relative_base: build_prefix,
        };

        let shared_vendor_dir = match &overrides.vendor_dir {
            Some(dir) => normalize_path(&project_dir.join(dir)),
            None => build.vendor.clone(),
        };

        let symlink_base_path = overrides
            .symlink_base_path
            .as_deref()
            .or(manifest.symlink_base_path.as_deref())
            .and_then(normalize_symlink_base_path);

        let matcher = PackageMatcher::new(&manifest.package_list, manifest.selection)?;
        let deploy_paths = DeployPaths::new(manifest.installer_paths.clone())?;
        let build_root = manifest
            .root_dir
            .as_ref()
            .map(|root| root.select(mode.is_no_dev()).to_string())
            .filter(|root| !root.is_empty());

        let config = Self {
            shared_bin_dir: build.bin.clone(),
            symlink_dir: build.vendor.clone(),
            store_dir: original.vendor.clone(),
            project_id: project_dir.to_string_lossy().into_owned(),
            original,
            build,
            shared_vendor_dir,
            symlink_base_path,
            symlink_enabled: manifest.symlink_enabled,
            build_root,
            package_list: manifest.package_list.clone(),
            selection: manifest.selection,
            matcher,
            deploy_paths,
        };

        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Every store root this project installs into, each with its own
    /// ledger and lock.
    pub fn store_roots(&self) -> Vec<&Path> {
        let mut roots = vec![self.store_dir.as_path()];
        if self.shared_vendor_dir != self.store_dir {
            roots.push(self.shared_vendor_dir.as_path());
        }
        roots
    }
}

fn build_prefix(manifest: &ProjectManifest, mode: BuildMode, branch: Option<String>) -> Result<PathBuf> {
    let Some(build_dir) = &manifest.build_dir else {
        return Ok(PathBuf::new());
    };

    let mut vars = BTreeMap::new();
    if let Some(branch) = branch {
        vars.insert("branch", branch);
    }

    let template = build_dir.select(mode.is_no_dev());
    let rendered = render_template(template, &vars)
        .map_err(|e| Error::config(format!("\"build-dir\": {}", e)))?;
    Ok(PathBuf::from(rendered.trim_end_matches('/')))
}

/// Strip a trailing `/`; a relative path with more than one segment is
/// resolved from `<vendor>/<vendor-name>/`, two levels below the project.
fn normalize_symlink_base_path(value: &str) -> Option<String> {
    let trimmed = value.strip_suffix('/').unwrap_or(value);
    if trimmed.is_empty() {
        return None;
    }

    if trimmed.find('/').is_some_and(|pos| pos > 0) {
        Some(format!("../../{}", trimmed))
    } else {
        Some(trimmed.to_string())
    }
}
