use anyhow::Result;
use std::path::PathBuf;

use super::{Options, load_config, load_packages, load_repository, router};
use crate::host::Installer;
use crate::runtime::Runtime;
use crate::store::PathResolver;

/// Show where packages live and whether they are installed.
#[tracing::instrument(skip(runtime, options))]
pub fn status<R: Runtime>(runtime: R, options: &Options, descriptors: &[PathBuf]) -> Result<()> {
    let config = load_config(&runtime, options)?;
    let packages = load_packages(&runtime, descriptors)?;
    let repo = load_repository(&runtime, &config)?;

    let router = router(&runtime, &config, options.confirm);
    let resolver = PathResolver::new(&config);

    for package in &packages {
        let shared = router.is_shared(package);
        println!("{}", package);
        println!("  shared:    {}", if shared { "yes" } else { "no" });
        println!(
            "  installed: {}",
            if router.is_installed(&repo, package) {
                "yes"
            } else {
                "no"
            }
        );
        println!("  path:      {}", router.install_path(package).display());
        if shared && resolver.exposes_via_symlink(package) {
            println!("  symlink:   {}", resolver.symlink_path(package).display());
        }
    }

    Ok(())
}
