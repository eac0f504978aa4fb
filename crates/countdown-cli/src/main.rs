use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "countdown", version, about = "Countdown timer with voice reminders")]
struct Cli {
    /// Settings file (default: ~/.config/countdown/settings.toml)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a countdown
    Start(commands::start::StartArgs),
    /// Print the phrase announced for a number of seconds
    Phrase {
        /// Remaining seconds
        seconds: u64,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start(args) => commands::start::run(args, cli.settings),
        Commands::Phrase { seconds } => commands::phrase::run(seconds),
        Commands::Config { action } => commands::config::run(action, cli.settings),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
