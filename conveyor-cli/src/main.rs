//! Conveyor CLI
//!
//! Command-line interface for controlling the Conveyor orchestrator.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Conveyor job pipeline CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(long, env = "CONVEYOR_URL", default_value = "http://localhost:5000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.url,
    };

    handle_command(cli.command, &config).await
}
