use anyhow::Result;
use std::path::PathBuf;

use super::{Options, load_config, load_packages, load_repository, router, save_after};
use crate::host::Installer;
use crate::runtime::Runtime;

/// Remove packages from the project.
#[tracing::instrument(skip(runtime, options))]
pub fn uninstall<R: Runtime>(runtime: R, options: &Options, descriptors: &[PathBuf]) -> Result<()> {
    let config = load_config(&runtime, options)?;
    let packages = load_packages(&runtime, descriptors)?;
    let mut repo = load_repository(&runtime, &config)?;

    let router = router(&runtime, &config, options.confirm);
    for package in &packages {
        let result = router.uninstall(&mut repo, package);
        save_after(&runtime, &repo, result)?;
        println!("Uninstalled {}", package);
    }

    Ok(())
}
