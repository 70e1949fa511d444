use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::package::Package;
use crate::runtime::Runtime;

/// Directory (inside the build vendor dir) holding the local record.
pub const RECORD_DIR: &str = ".pkgshare";
pub const RECORD_FILE: &str = "installed.json";

#[derive(Serialize, Deserialize, Debug, Default)]
struct RecordDocument {
    #[serde(default)]
    packages: Vec<Package>,
}

/// The project's record of installed packages.
#[derive(Debug, Clone, Default)]
pub struct InstalledRepository {
    path: PathBuf,
    packages: Vec<Package>,
}

impl InstalledRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packages: Vec::new(),
        }
    }

    pub fn default_path(vendor_dir: &Path) -> PathBuf {
        vendor_dir.join(RECORD_DIR).join(RECORD_FILE)
    }

    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            debug!("No local record at {:?}", path);
            return Ok(Self::new(path));
        }

        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read local record {:?}", path))?;
        let document: RecordDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse local record {:?}", path))?;

        Ok(Self {
            path: path.to_path_buf(),
            packages: document.packages,
        })
    }

    #[tracing::instrument(skip(self, runtime))]
    pub fn save<R: Runtime>(&self, runtime: &R) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            runtime.create_dir_all(parent)?;
        }

        let document = RecordDocument {
            packages: self.packages.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        runtime
            .write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write local record {:?}", self.path))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn has_package(&self, package: &Package) -> bool {
        self.packages.iter().any(|p| p.same_identity(package))
    }

    /// Add `package`, replacing an entry with the same identity.
    pub fn add_package(&mut self, package: &Package) {
        self.remove_package(package);
        self.packages.push(package.clone());
        self.packages
            .sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
    }

    pub fn remove_package(&mut self, package: &Package) {
        self.packages.retain(|p| !p.same_identity(package));
    }
}
