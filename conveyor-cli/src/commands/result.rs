//! Result command handlers

use anyhow::Result;
use colored::*;
use conveyor_client::ConveyorClient;
use conveyor_core::domain::job::{JobResult, Outcome};
use conveyor_core::dto::result::ResultQuery;

/// List job results
pub async fn list_results(
    client: &ConveyorClient,
    status: Option<Outcome>,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<()> {
    let page = client
        .list_results(&ResultQuery {
            status,
            limit,
            offset,
        })
        .await?;

    if page.results.is_empty() {
        println!("{}", "No results found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "Showing {} of {} result(s) (offset {}):",
            page.results.len(),
            page.total,
            page.offset
        )
        .bold()
    );
    println!();
    for result in &page.results {
        print_result(result);
    }

    Ok(())
}

/// Show aggregate statistics
pub async fn stats(client: &ConveyorClient) -> Result<()> {
    let stats = client.result_stats().await?;

    println!("{}", "Result Statistics:".bold());
    println!("  Total:          {}", stats.total);
    println!("  Successful:     {}", stats.successful.to_string().green());
    println!("  Failed:         {}", stats.failed.to_string().red());
    println!("  Success rate:   {:.1}%", stats.success_rate);
    println!("  Avg processing: {:.1}s", stats.avg_processing_secs);

    Ok(())
}

fn print_result(result: &JobResult) {
    println!(
        "  {} Job #{} {}",
        "▸".cyan(),
        result.job_index,
        colorize_outcome(result.outcome)
    );
    if let Some(identity) = &result.identity {
        println!("    Identity:  {}", identity);
    }
    if let Some(email) = &result.aux_email {
        println!("    Aux email: {}", email.dimmed());
    }
    if let Some(error) = &result.error_detail {
        println!("    Error:     {}", error.red());
    }
    println!(
        "    Took:      {:.1}s, completed {}",
        result.processing_time.as_secs_f64(),
        result
            .completed_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Colorize a job outcome for display
fn colorize_outcome(outcome: Outcome) -> colored::ColoredString {
    match outcome {
        Outcome::Success => "✓ success".green(),
        Outcome::Failure => "✗ failure".red(),
    }
}
