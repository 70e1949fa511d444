use anyhow::Result;
use clap::Parser;
use pkgshare::commands::{self, Options};
use pkgshare::config::BuildMode;
use pkgshare::installer::ConfirmPolicy;
use std::path::PathBuf;

/// pkgshare - install packages once, share them between projects
///
/// Shared packages are installed into a store and linked into every project
/// that uses them. A usage ledger keeps a shared source until the last
/// project using it uninstalls it.
///
/// Examples:
///   pkgshare install packages/acme-lib.json
///   pkgshare --project ../site uninstall packages/acme-lib.json
#[derive(Parser, Debug)]
#[command(author, version = env!("PKGSHARE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory (defaults to the current directory; also via PKGSHARE_PROJECT)
    #[arg(
        long = "project",
        short = 'p',
        env = "PKGSHARE_PROJECT",
        value_name = "DIR",
        global = true
    )]
    project: Option<PathBuf>,

    /// Use the no-dev variants of build-dir and root-dir
    #[arg(long = "no-dev", global = true)]
    no_dev: bool,

    /// Delete unused shared sources without asking
    #[arg(long, short = 'y', global = true, conflicts_with = "no_interaction")]
    yes: bool,

    /// Never prompt; unused shared sources are kept
    #[arg(long = "no-interaction", short = 'n', global = true)]
    no_interaction: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Install packages and materialize them into the build tree
    Install(PackagesArgs),

    /// Update a package from one version to another
    Update(UpdateArgs),

    /// Uninstall packages
    Uninstall(PackagesArgs),

    /// Show whether packages are installed and where they live
    Status(PackagesArgs),

    /// Show which projects use shared packages
    Usage(UsageArgs),

    /// Show the resolved directory layout
    Paths,
}

#[derive(clap::Args, Debug)]
struct PackagesArgs {
    /// Package descriptor files (JSON)
    #[arg(value_name = "PACKAGE.json", required = true)]
    packages: Vec<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct UpdateArgs {
    /// Descriptor of the installed version
    #[arg(value_name = "INITIAL.json")]
    initial: PathBuf,

    /// Descriptor of the version to install
    #[arg(value_name = "TARGET.json")]
    target: PathBuf,
}

#[derive(clap::Args, Debug)]
struct UsageArgs {
    /// Only show these packages
    #[arg(value_name = "PACKAGE.json")]
    packages: Vec<PathBuf>,
}

impl Cli {
    fn options(&self) -> Options {
        let confirm = if self.yes {
            ConfirmPolicy::AssumeYes
        } else if self.no_interaction {
            ConfirmPolicy::AssumeNo
        } else {
            ConfirmPolicy::Ask
        };

        Options::new(self.project.clone().unwrap_or_else(|| PathBuf::from(".")))
            .with_mode(BuildMode::from_no_dev(self.no_dev))
            .with_confirm(confirm)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("pkgshare=info"))
        .init();
    let cli = Cli::parse();
    let options = cli.options();
    let runtime = pkgshare::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => commands::install(runtime, &options, &args.packages)?,
        Commands::Update(args) => {
            commands::update(runtime, &options, &args.initial, &args.target)?
        }
        Commands::Uninstall(args) => commands::uninstall(runtime, &options, &args.packages)?,
        Commands::Status(args) => commands::status(runtime, &options, &args.packages)?,
        Commands::Usage(args) => commands::usage(runtime, &options, &args.packages)?,
        Commands::Paths => commands::paths(runtime, &options)?,
    }
    Ok(())
}
