use anyhow::Result;
use log::info;
use std::path::PathBuf;

use super::{Options, load_config, load_packages, load_repository, router, save_after};
use crate::build::{BuildTreeMaterializer, Materialized};
use crate::host::Installer;
use crate::runtime::Runtime;

/// Install packages into the project, then materialize them into the build tree.
#[tracing::instrument(skip(runtime, options))]
pub fn install<R: Runtime>(runtime: R, options: &Options, descriptors: &[PathBuf]) -> Result<()> {
    let config = load_config(&runtime, options)?;
    let packages = load_packages(&runtime, descriptors)?;
    let mut repo = load_repository(&runtime, &config)?;

    let router = router(&runtime, &config, options.confirm);
    let materializer = BuildTreeMaterializer::new(&runtime, &config);

    for package in &packages {
        if router.is_installed(&repo, package) {
            info!("{} is already installed", package);
        } else {
            let result = router.install(&mut repo, package);
            save_after(&runtime, &repo, result)?;
        }

        let kind = if router.is_shared(package) {
            "shared"
        } else {
            "private"
        };
        println!(
            "Installed {} ({}) at {}",
            package,
            kind,
            router.install_path(package).display()
        );

        match materializer.on_package_installed(package, &router)? {
            Materialized::Copied { destination } => {
                println!("  copied to {}", destination.display())
            }
            Materialized::Linked { destination, .. } => {
                println!("  linked at {}", destination.display())
            }
            Materialized::Skipped => {}
        }
    }

    Ok(())
}
