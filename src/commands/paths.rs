use anyhow::Result;

use super::{Options, load_config};
use crate::runtime::Runtime;

/// Print the resolved directory layout of the project.
#[tracing::instrument(skip(runtime, options))]
pub fn paths<R: Runtime>(runtime: R, options: &Options) -> Result<()> {
    let config = load_config(&runtime, options)?;

    println!("project:       {}", config.original.base.display());
    println!("store:         {}", config.store_dir.display());
    println!("build base:    {}", config.build.base.display());
    println!("symlinks:      {}", config.symlink_dir.display());
    println!("shared vendor: {}", config.shared_vendor_dir.display());
    println!("shared bin:    {}", config.shared_bin_dir.display());
    if let Some(base) = &config.symlink_base_path {
        println!("symlink base:  {}", base);
    }
    if !config.symlink_enabled {
        println!("symlinks are disabled");
    }
    if let Some(root) = &config.build_root {
        println!("build root:    {}", root);
    }
    Ok(())
}
