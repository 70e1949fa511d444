//! Package descriptors.
//!
//! A [`Package`] is owned by the host and read-only to the installers. It is
//! identified by its pretty name and pretty version; everything else is
//! attributes the routing and path rules look at.

mod matcher;

pub use matcher::{PackageMatcher, SelectionMode, Selector};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Package types that belong to the host itself (plugins and custom installers).
pub const HOST_INTERNAL_TYPES: &[&str] = &["composer-plugin", "composer-installer"];

/// Pretty name of this tool when it is itself installed as a package.
pub const SELF_PACKAGE_NAME: &str = "pkgshare/pkgshare";

/// Package type that always opts into the shared store.
pub const SHARED_PACKAGE_TYPE: &str = "shared-package";

/// Metadata key set by patching tools once patches were applied.
pub const PATCHES_APPLIED_KEY: &str = "patches_applied";

fn default_type() -> String {
    "library".to_string()
}

/// Package descriptor as read from a composer-style JSON document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Package {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", default = "default_type")]
    pub package_type: String,
    #[serde(rename = "target-dir", default, skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<String>,
    #[serde(rename = "bin", default, skip_serializing_if = "Vec::is_empty")]
    pub binaries: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
    /// Local directory the package's files are copied from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dist: Option<PathBuf>,
    #[serde(
        rename = "installation-source",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub installation_source: Option<String>,
}

impl Package {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            package_type: default_type(),
            target_dir: None,
            binaries: Vec::new(),
            extra: serde_json::Map::new(),
            dist: None,
            installation_source: None,
        }
    }

    pub fn with_type(mut self, package_type: impl Into<String>) -> Self {
        self.package_type = package_type.into();
        self
    }

    pub fn with_binaries<I, S>(mut self, binaries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binaries = binaries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_dir(mut self, target_dir: impl Into<String>) -> Self {
        self.target_dir = Some(target_dir.into());
        self
    }

    pub fn with_dist(mut self, dist: impl Into<PathBuf>) -> Self {
        self.dist = Some(dist.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> PackageId {
        PackageId {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }

    pub fn has_binaries(&self) -> bool {
        !self.binaries.is_empty()
    }

    pub fn is_patched(&self) -> bool {
        self.extra.contains_key(PATCHES_APPLIED_KEY)
    }

    pub fn is_host_internal(&self) -> bool {
        HOST_INTERNAL_TYPES.contains(&self.package_type.as_str())
    }

    /// Vendor segment of the pretty name (`acme` for `acme/lib`).
    pub fn vendor(&self) -> &str {
        self.name.split_once('/').map_or("", |(vendor, _)| vendor)
    }

    /// Project segment of the pretty name (`lib` for `acme/lib`).
    pub fn short_name(&self) -> &str {
        self.name
            .split_once('/')
            .map_or(self.name.as_str(), |(_, name)| name)
    }

    /// Same identity as `other` (name and version).
    pub fn same_identity(&self, other: &Package) -> bool {
        self.name == other.name && self.version == other.version
    }

    /// Load a descriptor from a JSON file.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read package descriptor {:?}", path))?;
        let mut package: Package = serde_json::from_str(&content)
            .with_context(|| format!("Invalid package descriptor {:?}", path))?;

        // A relative dist is relative to the descriptor
        if let Some(dist) = &package.dist
            && dist.is_relative()
            && let Some(parent) = path.parent()
        {
            package.dist = Some(parent.join(dist));
        }

        Ok(package)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

/// Identity of a package: pretty name and pretty version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId {
    pub name: String,
    pub version: String,
}

impl PackageId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use serde_json::json;

    #[test]
    fn test_deserialize_composer_style_descriptor() {
        let package: Package = serde_json::from_value(json!({
            "name": "acme/tool",
            "version": "2.1.0",
            "type": "library",
            "bin": ["bin/tool"],
            "target-dir": "src",
            "extra": { "patches_applied": { "fix": "patches/fix.patch" } }
        }))
        .unwrap();

        assert_eq!(package.name, "acme/tool");
        assert_eq!(package.version, "2.1.0");
        assert_eq!(package.binaries, vec!["bin/tool"]);
        assert_eq!(package.target_dir.as_deref(), Some("src"));
        assert!(package.has_binaries());
        assert!(package.is_patched());
        assert!(!package.is_host_internal());
    }

    #[test]
    fn test_defaults() {
        let package: Package =
            serde_json::from_value(json!({ "name": "acme/lib", "version": "1.0.0" })).unwrap();
        assert_eq!(package.package_type, "library");
        assert!(package.binaries.is_empty());
        assert!(!package.is_patched());
        assert_eq!(package.dist, None);
    }

    #[test]
    fn test_name_segments() {
        let package = Package::new("acme/bar-baz", "1.0.0");
        assert_eq!(package.vendor(), "acme");
        assert_eq!(package.short_name(), "bar-baz");

        let bare = Package::new("standalone", "1.0.0");
        assert_eq!(bare.vendor(), "");
        assert_eq!(bare.short_name(), "standalone");
    }

    #[test]
    fn test_host_internal_types() {
        assert!(
            Package::new("acme/plugin", "1.0.0")
                .with_type("composer-plugin")
                .is_host_internal()
        );
        assert!(
            Package::new("acme/installer", "1.0.0")
                .with_type("composer-installer")
                .is_host_internal()
        );
    }

    #[test]
    fn test_display_and_id() {
        let package = Package::new("acme/lib", "1.0.0");
        assert_eq!(package.to_string(), "acme/lib (1.0.0)");
        assert_eq!(package.id(), PackageId::new("acme/lib", "1.0.0"));
        assert_eq!(package.id().to_string(), "acme/lib (1.0.0)");
    }

    #[test]
    fn test_load_resolves_relative_dist() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/packages/acme-lib.json");

        runtime
            .expect_read_to_string()
            .with(eq(path.clone()))
            .returning(|_| {
                Ok(r#"{"name": "acme/lib", "version": "1.0.0", "dist": "dist/acme-lib"}"#.into())
            });

        let package = Package::load(&runtime, &path).unwrap();
        assert_eq!(
            package.dist,
            Some(PathBuf::from("/packages/dist/acme-lib"))
        );
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("{ not json".into()));

        let result = Package::load(&runtime, Path::new("/packages/broken.json"));
        assert!(result.is_err());
    }
}
