//! Pipeline command handlers
//!
//! Start, stop, status and reset of the pipeline.

use anyhow::Result;
use chrono::Utc;
use colored::*;
use conveyor_client::{ClientError, ConveyorClient};
use conveyor_core::domain::state::PipelineState;
use conveyor_core::dto::pipeline::{PipelineSnapshot, format_elapsed, format_eta};

/// Start a run
pub async fn start(client: &ConveyorClient, index: u64) -> Result<()> {
    match client.start(index).await {
        Ok(accepted) => {
            println!("{}", "✓ Pipeline started".green().bold());
            println!("  Run:         {}", accepted.run_id.to_string().dimmed());
            println!("  Start index: {}", accepted.start_index.to_string().cyan());
            println!("  Jobs:        {}", accepted.job_count);
            Ok(())
        }
        Err(e) if e.kind() == Some("already_running") => {
            println!(
                "{}",
                "⚠ Pipeline is already running. Use `conveyor stop` first.".yellow()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Stop the active run
pub async fn stop(client: &ConveyorClient) -> Result<()> {
    match client.stop().await {
        Ok(stopped) => {
            println!("{}", "✓ Stop requested".green().bold());
            println!("  {}", stopped.message.dimmed());
            print_counters(&stopped.state);
            println!();
            println!(
                "Resume with: {}",
                format!("conveyor start --index {}", stopped.state.current_index).cyan()
            );
            Ok(())
        }
        Err(ClientError::ApiError { status: 409, .. }) => {
            println!("{}", "No run is currently active.".yellow());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Show pipeline progress
pub async fn status(client: &ConveyorClient) -> Result<()> {
    let snapshot = client.status().await?;
    print_snapshot(&snapshot);
    Ok(())
}

/// Zero the counters
pub async fn reset(client: &ConveyorClient) -> Result<()> {
    let state = client.reset().await?;
    println!("{}", "✓ Pipeline state reset".green().bold());
    print_counters(&state);
    Ok(())
}

fn print_snapshot(snapshot: &PipelineSnapshot) {
    let state = &snapshot.state;

    println!("{}", "Pipeline Status:".bold());
    println!("  State:        {}", colorize_running(state.is_running));
    if let Some(started) = state.started_at {
        println!(
            "  Started:      {} ({} ago)",
            started.format("%Y-%m-%d %H:%M:%S"),
            format_elapsed((Utc::now() - started).num_seconds())
        );
    }
    println!("  {}", progress_line(snapshot));
    print_counters(state);
    println!("  Success rate: {:.1}%", snapshot.success_rate);
    if let Some(eta) = snapshot.eta_secs {
        println!("  ETA:          {}", format_eta(eta).cyan());
    }
    println!(
        "  Updated:      {}",
        state
            .last_updated
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
}

fn print_counters(state: &PipelineState) {
    println!("  Processed:    {}", state.total_processed);
    println!("  Succeeded:    {}", state.success_count.to_string().green());
    println!("  Failed:       {}", state.fail_count.to_string().red());
}

/// "Progress:     12/40 (28 remaining)"
fn progress_line(snapshot: &PipelineSnapshot) -> String {
    format!(
        "Progress:     {}/{} ({} remaining)",
        snapshot.state.current_index,
        snapshot.job_count,
        snapshot.remaining()
    )
}

fn colorize_running(is_running: bool) -> colored::ColoredString {
    if is_running {
        "RUNNING".cyan()
    } else {
        "STOPPED".dimmed()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_progress_line() {
        let mut state = PipelineState::default();
        state.current_index = 12;

        let snapshot = PipelineSnapshot::new(state, 40, Duration::from_secs(300));
        assert_eq!(progress_line(&snapshot), "Progress:     12/40 (28 remaining)");
    }

    #[test]
    fn test_colorize_running() {
        colored::control::set_override(false);
        assert_eq!(colorize_running(true).to_string(), "RUNNING");
        assert_eq!(colorize_running(false).to_string(), "STOPPED");
    }
}
