//! terragrid CLI
//!
//! Inspect the geodata pipeline from the command line: compute a single
//! column against the configured remote datasets, or manage the config file.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::probe::ProbeArgs;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "terragrid")]
#[command(version = terragrid::VERSION)]
#[command(about = "Real-world geodata for block worlds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute one chunk column and summarize its data
    Probe(ProbeArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Config { command } => commands::config::run(command),
        Commands::Probe(args) => {
            let runner = CliRunner::new()?;
            runner.log_startup("probe");
            commands::probe::run(args, runner.config()).await
        }
    }
}
