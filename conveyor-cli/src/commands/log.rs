//! Log command handlers

use anyhow::Result;
use colored::*;
use conveyor_client::ConveyorClient;
use conveyor_core::domain::log::{LogEntry, LogLevel};

/// Show recent pipeline log entries, oldest first
pub async fn recent_logs(client: &ConveyorClient, limit: Option<u32>) -> Result<()> {
    let logs = client.recent_logs(limit).await?;

    if logs.is_empty() {
        println!("{}", "No log entries found.".yellow());
        return Ok(());
    }

    println!("{}", "─".repeat(80).dimmed());
    for log in logs.iter().rev() {
        print_log_entry(log);
    }
    println!("{}", "─".repeat(80).dimmed());

    Ok(())
}

/// Print a log entry
fn print_log_entry(log: &LogEntry) {
    let job = log
        .related_job_index
        .map(|i| format!(" #{}", i))
        .unwrap_or_default();

    println!(
        "{} [{}]{} {}",
        log.at.format("%H:%M:%S").to_string().dimmed(),
        colorize_level(log.level),
        job.dimmed(),
        log.message
    );
}

fn colorize_level(level: LogLevel) -> colored::ColoredString {
    let level_str = level.as_str().to_uppercase();
    match level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    }
}
