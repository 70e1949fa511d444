//! Deploy rules: where a package lands inside the build-output tree.

use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::template::render_template;
use crate::error::Error;
use crate::package::Package;

const TYPE_PREFIX: &str = "type:";
const VENDOR_PREFIX: &str = "vendor:";

/// One `installer-paths` entry.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DeployRule {
    /// Destination relative to the build base; may use `{$name}`, `{$vendor}`, `{$type}`.
    pub path: String,
    #[serde(rename = "match")]
    pub selectors: Vec<String>,
}

impl DeployRule {
    pub fn matches(&self, package: &Package) -> bool {
        self.selectors.iter().any(|selector| {
            if let Some(package_type) = selector.strip_prefix(TYPE_PREFIX) {
                package_type == package.package_type
            } else if let Some(vendor) = selector.strip_prefix(VENDOR_PREFIX) {
                vendor == package.vendor()
            } else {
                selector == &package.name
            }
        })
    }

    fn validate(&self) -> Result<()> {
        if self.path.trim().is_empty() {
            return Err(Error::config("\"installer-paths\" entries need a path").into());
        }
        if self.selectors.is_empty() || self.selectors.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::config(format!(
                "\"installer-paths\" entry {:?} needs non-empty match selectors",
                self.path
            ))
            .into());
        }
        Ok(())
    }
}

/// Ordered deploy rules; the first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeployPaths {
    rules: Vec<DeployRule>,
}

impl DeployPaths {
    pub fn new(rules: Vec<DeployRule>) -> Result<Self> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Path of `package` relative to the build base, or `None` when no rule selects it.
    pub fn resolve(&self, package: &Package) -> Result<Option<PathBuf>> {
        let Some(rule) = self.rules.iter().find(|rule| rule.matches(package)) else {
            return Ok(None);
        };

        let vars: BTreeMap<&str, String> = [
            ("name", package.short_name().to_string()),
            ("vendor", package.vendor().to_string()),
            ("type", package.package_type.clone()),
        ]
        .into_iter()
        .collect();

        let rendered = render_template(&rule.path, &vars)?;
        Ok(Some(PathBuf::from(rendered.trim_end_matches('/'))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, selectors: &[&str]) -> DeployRule {
        DeployRule {
            path: path.to_string(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_selector_kinds() {
        let by_type = rule("x", &["type:drupal-module"]);
        let by_vendor = rule("x", &["vendor:acme"]);
        let by_name = rule("x", &["other/tool"]);

        let module = Package::new("drupal/views", "1.0.0").with_type("drupal-module");
        let acme = Package::new("acme/lib", "1.0.0");
        let tool = Package::new("other/tool", "1.0.0");

        assert!(by_type.matches(&module));
        assert!(!by_type.matches(&acme));
        assert!(by_vendor.matches(&acme));
        assert!(!by_vendor.matches(&tool));
        assert!(by_name.matches(&tool));
        assert!(!by_name.matches(&acme));
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let paths = DeployPaths::new(vec![
            rule("web/custom/{$name}/", &["acme/lib"]),
            rule("web/{$vendor}/{$name}", &["vendor:acme"]),
        ])
        .unwrap();

        assert_eq!(
            paths.resolve(&Package::new("acme/lib", "1.0.0")).unwrap(),
            Some(PathBuf::from("web/custom/lib"))
        );
        assert_eq!(
            paths.resolve(&Package::new("acme/other", "1.0.0")).unwrap(),
            Some(PathBuf::from("web/acme/other"))
        );
        assert_eq!(
            paths.resolve(&Package::new("third/lib", "1.0.0")).unwrap(),
            None
        );
    }

    #[test]
    fn test_type_variable() {
        let paths = DeployPaths::new(vec![rule("web/{$type}/{$name}", &["vendor:drupal"])]).unwrap();
        let module = Package::new("drupal/views", "1.0.0").with_type("drupal-module");
        assert_eq!(
            paths.resolve(&module).unwrap(),
            Some(PathBuf::from("web/drupal-module/views"))
        );
    }

    #[test]
    fn test_unknown_variable_is_an_error() {
        let paths = DeployPaths::new(vec![rule("web/{$branch}/{$name}", &["acme/lib"])]).unwrap();
        assert!(paths.resolve(&Package::new("acme/lib", "1.0.0")).is_err());
    }

    #[test]
    fn test_rules_need_selectors() {
        assert!(DeployPaths::new(vec![rule("web/{$name}", &[])]).is_err());
        assert!(DeployPaths::new(vec![rule("web/{$name}", &[""])]).is_err());
        assert!(DeployPaths::new(vec![rule(" ", &["acme/lib"])]).is_err());
    }
}
