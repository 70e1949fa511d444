use anyhow::Result;
use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{Options, load_config, load_packages};
use crate::config::ledger_path;
use crate::package::PackageId;
use crate::runtime::Runtime;
use crate::store::JsonUsageLedger;

/// Print which projects use which shared packages.
#[tracing::instrument(skip(runtime, options))]
pub fn usage<R: Runtime>(runtime: R, options: &Options, descriptors: &[PathBuf]) -> Result<()> {
    let config = load_config(&runtime, options)?;
    let filter: BTreeSet<PackageId> = load_packages(&runtime, descriptors)?
        .iter()
        .map(|package| package.id())
        .collect();

    let mut printed = 0;
    for root in config.store_roots() {
        let document = JsonUsageLedger::new(&runtime, ledger_path(root)).load()?;

        for (id, record) in document.entries() {
            if !filter.is_empty() && !filter.contains(&id) {
                continue;
            }

            printed += 1;
            match &record.installation_source {
                Some(source) => println!("{} [{}]", id, source),
                None => println!("{}", id),
            }
            for project in &record.projects {
                println!("  {}", project);
            }
        }
    }

    if printed == 0 {
        println!("No shared packages in use.");
    }
    Ok(())
}
