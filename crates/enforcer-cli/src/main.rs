mod cmd;
mod output;
mod settings;
mod shutdown;

use clap::{Parser, Subcommand};
use settings::{ensure_valid, SettingsArgs};
use std::io::IsTerminal;

#[derive(Parser)]
#[command(
    name = "swarm-enforcer",
    about = "Keep every swarm service's restart and update delays at their desired values",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Reconcile continuously until interrupted (default)
    Run,

    /// Run a single reconciliation pass and exit
    Once,

    /// Show what the next pass would change, without changing anything
    Check,

    /// Print the effective configuration and validate it
    Config,

    /// Print the values filled in for fields a service never configured
    Defaults,
}

fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let default_level = match command {
        Commands::Run | Commands::Once => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let result = cli.settings.resolve().and_then(|settings| match command {
        Commands::Config => cmd::config::show(&settings, cli.json),
        Commands::Defaults => cmd::config::defaults(cli.json),
        Commands::Run => ensure_valid(&settings).and_then(|()| cmd::run::run(&settings)),
        Commands::Once => {
            ensure_valid(&settings).and_then(|()| cmd::run::once(&settings, cli.json))
        }
        Commands::Check => {
            ensure_valid(&settings).and_then(|()| cmd::check::run(&settings, cli.json))
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
