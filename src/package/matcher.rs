//! Shared-package selection.
//!
//! The configured package list is compiled once into [`Selector`]s and then
//! reused for every `is_shared` query.

use anyhow::Result;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};

use super::{Package, SELF_PACKAGE_NAME, SHARED_PACKAGE_TYPE};
use crate::error::Error;

const WILDCARD: &str = "*";

/// How packages are classified as shared.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMode {
    /// Every package whose type is not host-internal is shared; the package list is not consulted.
    #[default]
    All,
    /// Only packages selected by the package list (or typed `shared-package`) are shared.
    PackageList,
}

/// One compiled entry of the package list.
#[derive(Debug, Clone)]
pub enum Selector {
    ExactName(String),
    Glob(Pattern),
}

impl Selector {
    /// Compile a package-list entry.
    ///
    /// Entries containing `*` become globs where each `*` stands for one or
    /// more characters of a single name segment: `acme/*` matches `acme/foo`
    /// but neither `acme/` nor `acme/foo/bar`.
    pub fn parse(entry: &str) -> Result<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(Error::config("\"package-list\" entries must not be empty").into());
        }

        if !entry.contains('*') {
            return Ok(Selector::ExactName(entry.to_string()));
        }

        let glob = entry
            .split('*')
            .map(Pattern::escape)
            .collect::<Vec<_>>()
            .join("?*");
        let pattern = Pattern::new(&glob).map_err(|e| {
            Error::config(format!("Invalid package-list pattern {:?}: {}", entry, e))
        })?;

        Ok(Selector::Glob(pattern))
    }

    pub fn matches(&self, pretty_name: &str) -> bool {
        match self {
            Selector::ExactName(name) => name == pretty_name,
            Selector::Glob(pattern) => pattern.matches_with(
                pretty_name,
                MatchOptions {
                    case_sensitive: true,
                    require_literal_separator: true,
                    require_literal_leading_dot: false,
                },
            ),
        }
    }
}

/// Decides whether a package goes to the shared store.
#[derive(Debug, Clone)]
pub struct PackageMatcher {
    mode: SelectionMode,
    all_shared: bool,
    selectors: Vec<Selector>,
}

impl PackageMatcher {
    pub fn new(package_list: &[String], mode: SelectionMode) -> Result<Self> {
        let all_shared = package_list.iter().any(|entry| entry.trim() == WILDCARD);

        let selectors = if all_shared {
            Vec::new()
        } else {
            package_list
                .iter()
                .map(|entry| Selector::parse(entry))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            mode,
            all_shared,
            selectors,
        })
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn is_shared(&self, package: &Package) -> bool {
        if package.is_host_internal() {
            return false;
        }

        match self.mode {
            SelectionMode::All => true,
            SelectionMode::PackageList => self.is_selected(package),
        }
    }

    fn is_selected(&self, package: &Package) -> bool {
        // On first install this tool lands in the project's own vendor dir,
        // so it stays there on later runs too.
        if package.name == SELF_PACKAGE_NAME {
            return false;
        }

        if self.all_shared || package.package_type == SHARED_PACKAGE_TYPE {
            return true;
        }

        self.selectors
            .iter()
            .any(|selector| selector.matches(&package.name))
    }
}
