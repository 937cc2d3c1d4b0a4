//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod log;
mod pipeline;
mod result;

use anyhow::Result;
use clap::Subcommand;
use conveyor_core::domain::job::Outcome;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start processing jobs
    Start {
        /// Index of the first job to process
        #[arg(short, long, default_value_t = 0)]
        index: u64,
    },
    /// Stop the active run after its current job
    Stop,
    /// Show pipeline progress
    Status,
    /// Zero the pipeline counters (only while idle)
    Reset,
    /// List job results, newest first
    Results {
        /// Only show results with this outcome (success or failure)
        #[arg(short, long)]
        status: Option<Outcome>,

        /// Page size (default 100, max 1000)
        #[arg(short, long)]
        limit: Option<u32>,

        /// Number of results to skip
        #[arg(short, long)]
        offset: Option<u32>,
    },
    /// Show aggregate result statistics
    Stats,
    /// Show recent pipeline log entries
    Logs {
        /// Number of entries (default 50, max 1000)
        #[arg(short, long)]
        limit: Option<u32>,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        Commands::Start { index } => pipeline::start(&client, index).await,
        Commands::Stop => pipeline::stop(&client).await,
        Commands::Status => pipeline::status(&client).await,
        Commands::Reset => pipeline::reset(&client).await,
        Commands::Results {
            status,
            limit,
            offset,
        } => result::list_results(&client, status, limit, offset).await,
        Commands::Stats => result::stats(&client).await,
        Commands::Logs { limit } => log::recent_logs(&client, limit).await,
    }
}
