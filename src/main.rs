use anyhow::Result;
use clap::Parser;
use provisor::commands::{self, ProjectOptions};
use std::path::PathBuf;

/// provisor - project package provisioner
///
/// Installs the packages a project requires, the framework package, and
/// switches features on and off by editing the package manifest and the
/// project's scripting define symbols.
///
/// Examples:
///   provisor status                   # Show installed, missing and feature state
///   provisor install-required         # Install every missing required package
///   provisor feature Ads admob        # Select the "AdMob" option of the "Ads" feature
#[derive(Parser, Debug)]
#[command(author, version = env!("PROVISOR_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory (defaults to the current directory; also via PROVISOR_PROJECT)
    #[arg(
        long = "project",
        short = 'p',
        env = "PROVISOR_PROJECT",
        value_name = "PATH",
        global = true
    )]
    pub project: Option<PathBuf>,

    /// Installer settings file (defaults to <project>/Installer/settings.json; also via PROVISOR_SETTINGS)
    #[arg(long = "settings", env = "PROVISOR_SETTINGS", value_name = "FILE", global = true)]
    pub settings: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log through tracing, including spans
    #[arg(long, global = true)]
    pub trace: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show installed packages, missing requirements and feature state
    Status,

    /// Install every required package that is not installed yet
    InstallRequired,

    /// Install the framework package
    InstallFramework,

    /// List features and their current values
    Features,

    /// Set a feature value
    Feature(FeatureArgs),

    /// Write a starter settings file
    Init(InitArgs),

    /// Choose whether the installer is shown when the project opens
    Startup(StartupArgs),
}

#[derive(clap::Args, Debug)]
pub struct FeatureArgs {
    /// Feature label
    #[arg(value_name = "FEATURE")]
    pub label: String,

    /// `on`/`off` for toggles, an option label or index for option lists
    #[arg(value_name = "VALUE")]
    pub value: String,
}

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing settings file
    #[arg(long)]
    pub force: bool,
}

#[derive(clap::Args, Debug)]
pub struct StartupArgs {
    #[arg(value_enum)]
    pub state: Switch,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

fn init_logging(verbose: u8, trace: bool) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    if trace {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.trace);
    let runtime = provisor::runtime::RealRuntime;
    let options = ProjectOptions::new(cli.project, cli.settings);

    match cli.command {
        Commands::Status => commands::status(runtime, options).await?,
        Commands::InstallRequired => commands::install_required(runtime, options).await?,
        Commands::InstallFramework => commands::install_framework(runtime, options).await?,
        Commands::Features => commands::features(runtime, options).await?,
        Commands::Feature(args) => commands::apply_feature(runtime, options, &args.label, &args.value).await?,
        Commands::Init(args) => commands::init(runtime, options, args.force)?,
        Commands::Startup(args) => commands::set_startup(runtime, options, args.state == Switch::On)?,
    }
    Ok(())
}
