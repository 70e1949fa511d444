use anyhow::Result;
use std::path::Path;

use super::{Options, load_config, load_package, load_repository, router, save_after};
use crate::host::Installer;
use crate::runtime::Runtime;

/// Replace an installed package with another version of it.
#[tracing::instrument(skip(runtime, options))]
pub fn update<R: Runtime>(
    runtime: R,
    options: &Options,
    initial: &Path,
    target: &Path,
) -> Result<()> {
    let config = load_config(&runtime, options)?;
    let initial = load_package(&runtime, initial)?;
    let target = load_package(&runtime, target)?;
    let mut repo = load_repository(&runtime, &config)?;

    let router = router(&runtime, &config, options.confirm);
    let result = router.update(&mut repo, &initial, &target);
    save_after(&runtime, &repo, result)?;

    println!(
        "Updated {} to {} at {}",
        initial,
        target,
        router.install_path(&target).display()
    );
    Ok(())
}
