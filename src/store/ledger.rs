//! Usage ledger: which projects depend on each shared package version.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::paths::PathResolver;
use crate::package::{Package, PackageId};
use crate::runtime::Runtime;

#[cfg_attr(test, mockall::automock)]
pub trait UsageLedger {
    fn add_usage(&self, id: &PackageId, project: &str) -> Result<()>;
    fn remove_usage(&self, id: &PackageId, project: &str) -> Result<()>;
    fn get_usage(&self, id: &PackageId) -> Result<BTreeSet<String>>;

    /// Remember how `package` was installed (`dist` or `source`) for later uninstalls.
    fn set_installation_source(&self, package: &Package) -> Result<()>;
}

/// Proof that at most one project references a package version.
///
/// Only this module can create one, so deleting a shared source always goes
/// through a ledger query first.
#[derive(Debug)]
pub struct LastReference {
    id: PackageId,
}

impl LastReference {
    pub fn id(&self) -> &PackageId {
        &self.id
    }
}

/// Returns the deletion token for `id` when its usage set has at most one member.
pub fn last_reference<L: UsageLedger + ?Sized>(
    ledger: &L,
    id: &PackageId,
) -> Result<Option<LastReference>> {
    let usage = ledger.get_usage(id)?;
    debug!("{} is used by {} project(s)", id, usage.len());

    if usage.len() <= 1 {
        Ok(Some(LastReference { id: id.clone() }))
    } else {
        Ok(None)
    }
}

/// The ledgers of a project's two store roots.
#[derive(Debug)]
pub struct StoreLedgers<L> {
    /// Counts version-qualified slots.
    pub versioned: L,
    /// Counts name-only slots in the shared vendor directory.
    pub named: L,
}

impl<L: UsageLedger> StoreLedgers<L> {
    pub fn new(versioned: L, named: L) -> Self {
        Self { versioned, named }
    }

    /// The ledger kept next to `package`'s slot.
    pub fn for_package(&self, package: &Package) -> &L {
        if PathResolver::uses_name_slot(package) {
            &self.named
        } else {
            &self.versioned
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct UsageRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_source: Option<String>,
    #[serde(default)]
    pub projects: BTreeSet<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct LedgerDocument {
    #[serde(default)]
    pub packages: BTreeMap<String, BTreeMap<String, UsageRecord>>,
}

impl LedgerDocument {
    fn record_mut(&mut self, id: &PackageId) -> &mut UsageRecord {
        self.packages
            .entry(id.name.clone())
            .or_default()
            .entry(id.version.clone())
            .or_default()
    }

    fn record(&self, id: &PackageId) -> Option<&UsageRecord> {
        self.packages.get(&id.name)?.get(&id.version)
    }

    fn prune(&mut self) {
        for versions in self.packages.values_mut() {
            versions.retain(|_, record| !record.projects.is_empty());
        }
        self.packages.retain(|_, versions| !versions.is_empty());
    }

    /// Every recorded (package, record) pair in name then version order.
    pub fn entries(&self) -> impl Iterator<Item = (PackageId, &UsageRecord)> {
        self.packages.iter().flat_map(|(name, versions)| {
            versions
                .iter()
                .map(move |(version, record)| (PackageId::new(name, version), record))
        })
    }
}

/// Ledger persisted as JSON, loaded and saved around every call.
pub struct JsonUsageLedger<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> JsonUsageLedger<'a, R> {
    pub fn new(runtime: &'a R, path: impl Into<PathBuf>) -> Self {
        Self {
            runtime,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Result<LedgerDocument> {
        if !self.runtime.exists(&self.path) {
            return Ok(LedgerDocument::default());
        }

        let content = self
            .runtime
            .read_to_string(&self.path)
            .with_context(|| format!("Failed to read usage ledger {:?}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse usage ledger {:?}", self.path))
    }

    #[tracing::instrument(skip(self, document))]
    pub fn save(&self, document: &LedgerDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            self.runtime.create_dir_all(parent)?;
        }

        let mut document = document.clone();
        document.prune();
        let json = serde_json::to_string_pretty(&document)?;

        let tmp_path = self.path.with_extension("json.tmp");
        self.runtime.write(&tmp_path, json.as_bytes())?;
        self.runtime
            .rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to write usage ledger {:?}", self.path))?;
        Ok(())
    }

    fn modify<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut LedgerDocument),
    {
        let mut document = self.load()?;
        change(&mut document);
        self.save(&document)
    }
}

impl<R: Runtime> UsageLedger for JsonUsageLedger<'_, R> {
    fn add_usage(&self, id: &PackageId, project: &str) -> Result<()> {
        debug!("Recording usage of {} by {}", id, project);
        self.modify(|document| {
            document.record_mut(id).projects.insert(project.to_string());
        })
    }

    fn remove_usage(&self, id: &PackageId, project: &str) -> Result<()> {
        debug!("Removing usage of {} by {}", id, project);
        self.modify(|document| {
            if let Some(versions) = document.packages.get_mut(&id.name)
                && let Some(record) = versions.get_mut(&id.version)
            {
                record.projects.remove(project);
            }
        })
    }

    fn get_usage(&self, id: &PackageId) -> Result<BTreeSet<String>> {
        let document = self.load()?;
        Ok(document
            .record(id)
            .map(|record| record.projects.clone())
            .unwrap_or_default())
    }

    fn set_installation_source(&self, package: &Package) -> Result<()> {
        let Some(source) = package.installation_source.clone() else {
            return Ok(());
        };

        let id = package.id();
        self.modify(|document| {
            if let Some(versions) = document.packages.get_mut(&id.name)
                && let Some(record) = versions.get_mut(&id.version)
            {
                record.installation_source = Some(source);
            }
        })
    }
}
