use anyhow::Result;
use log::debug;
use serde::Deserialize;
use std::path::Path;

use super::deploy::DeployRule;
use crate::error::Error;
use crate::package::SelectionMode;
use crate::runtime::Runtime;

pub const MANIFEST_FILE: &str = "pkgshare.json";

fn default_vendor_dir() -> String {
    "vendor".to_string()
}

fn default_bin_dir() -> String {
    "vendor/bin".to_string()
}

fn default_true() -> bool {
    true
}

/// A setting that is either shared by both build modes or split per mode.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum PerMode {
    Single(String),
    Split {
        dev: String,
        #[serde(rename = "no-dev")]
        no_dev: String,
    },
}

impl PerMode {
    pub fn select(&self, no_dev: bool) -> &str {
        match self {
            PerMode::Single(value) => value,
            PerMode::Split { dev, no_dev: prod } => {
                if no_dev {
                    prod
                } else {
                    dev
                }
            }
        }
    }
}

/// Contents of `pkgshare.json` at the project root.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ProjectManifest {
    #[serde(default = "default_vendor_dir")]
    pub vendor_dir: String,
    #[serde(default = "default_bin_dir")]
    pub bin_dir: String,
    #[serde(default)]
    pub build_dir: Option<PerMode>,
    #[serde(default)]
    pub root_dir: Option<PerMode>,
    #[serde(default)]
    pub symlink_base_path: Option<String>,
    #[serde(default = "default_true")]
    pub symlink_enabled: bool,
    #[serde(default)]
    pub package_list: Vec<String>,
    #[serde(default)]
    pub selection: SelectionMode,
    #[serde(default)]
    pub installer_paths: Vec<DeployRule>,
}

impl Default for ProjectManifest {
    fn default() -> Self {
        Self {
            vendor_dir: default_vendor_dir(),
            bin_dir: default_bin_dir(),
            build_dir: None,
            root_dir: None,
            symlink_base_path: None,
            symlink_enabled: true,
            package_list: Vec::new(),
            selection: SelectionMode::default(),
            installer_paths: Vec::new(),
        }
    }
}

impl ProjectManifest {
    pub fn parse(content: &str) -> Result<Self> {
        let manifest = serde_json::from_str(content)
            .map_err(|e| Error::config(format!("{} is malformed: {}", MANIFEST_FILE, e)))?;
        Ok(manifest)
    }

    /// Load the manifest of `project_dir`, falling back to defaults when there is none.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(MANIFEST_FILE);
        if !runtime.exists(&path) {
            debug!("No {} in {:?}, using defaults", MANIFEST_FILE, project_dir);
            return Ok(Self::default());
        }

        let content = runtime.read_to_string(&path)?;
        Self::parse(&content)
    }
}
