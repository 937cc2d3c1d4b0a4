//! Chat commands
//!
//! Parsing of chat messages into controller operations and rendering of
//! replies and progress notifications as plain text.

use chrono::Utc;
use conveyor_core::domain::job::Outcome;
use conveyor_core::domain::state::PipelineState;
use conveyor_core::dto::pipeline::{format_elapsed, format_eta};
use conveyor_core::dto::result::ResultQuery;

use crate::service::{ControlError, PipelineController, PipelineEvent};

/// Default number of entries listed by `/results` and `/logs`
const DEFAULT_CHAT_LIMIT: u32 = 10;

const WELCOME: &str = "\
Conveyor pipeline bot

Commands:
/start_auto <index> - start processing from an index
/stop - stop the current run
/status - current progress
/results [limit] - latest job results
/logs [limit] - latest pipeline log entries
/help - usage details";

const HELP: &str = "\
Usage

/start_auto <index> - start from the given job index (default 0)
/stop - stop after the job in progress
/status - progress, success rate and ETA
/results [limit] - latest job results (default 10)
/logs [limit] - latest log entries (default 10)

Examples:
/start_auto 0 - start from the first job
/start_auto 5 - start from the sixth job";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Welcome,
    Help,
    StartAuto { index: u64 },
    Stop,
    Status,
    Results { limit: Option<u32> },
    Logs { limit: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Plain text, not addressed to the bot
    NotACommand,
    Unknown(String),
    InvalidArgument { usage: &'static str },
}

impl ParseError {
    /// Reply for the user, `None` when the message should be ignored
    pub fn reply(&self) -> Option<String> {
        match self {
            ParseError::NotACommand => None,
            ParseError::Unknown(name) => Some(format!(
                "Unknown command /{}. Send /help for the list of commands.",
                name
            )),
            ParseError::InvalidArgument { usage } => Some(format!("Usage: {}", usage)),
        }
    }
}

impl ChatCommand {
    /// Parses `/command[@bot] [arg]`
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut parts = text.split_whitespace();

        let head = parts
            .next()
            .and_then(|head| head.strip_prefix('/'))
            .ok_or(ParseError::NotACommand)?;
        let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();
        let arg = parts.next();

        match name.as_str() {
            "start" => Ok(ChatCommand::Welcome),
            "help" => Ok(ChatCommand::Help),
            "start_auto" => {
                let index = parse_arg(arg, "/start_auto <index>")?.unwrap_or(0);
                Ok(ChatCommand::StartAuto { index })
            }
            "stop" => Ok(ChatCommand::Stop),
            "status" => Ok(ChatCommand::Status),
            "results" => Ok(ChatCommand::Results {
                limit: parse_arg(arg, "/results [limit]")?,
            }),
            "logs" => Ok(ChatCommand::Logs {
                limit: parse_arg(arg, "/logs [limit]")?,
            }),
            _ => Err(ParseError::Unknown(name)),
        }
    }
}

fn parse_arg<T: std::str::FromStr>(
    arg: Option<&str>,
    usage: &'static str,
) -> Result<Option<T>, ParseError> {
    arg.map(|a| a.parse::<T>())
        .transpose()
        .map_err(|_| ParseError::InvalidArgument { usage })
}

/// Runs a command against the controller and renders the reply
pub async fn execute(controller: &PipelineController, command: ChatCommand) -> String {
    match command {
        ChatCommand::Welcome => WELCOME.to_string(),
        ChatCommand::Help => HELP.to_string(),
        ChatCommand::StartAuto { index } => match controller.start(index).await {
            Ok(accepted) => format!(
                "Automation started\n\nStarting from index: {}\nJobs in queue: {}\nStatic credential: **********",
                accepted.start_index, accepted.job_count
            ),
            Err(ControlError::AlreadyRunning) => {
                "Automation is already running. Use /stop to stop it first.".to_string()
            }
            Err(ControlError::IndexOutOfRange { index, job_count }) => format!(
                "Starting index {} is out of range. Total jobs: {}",
                index, job_count
            ),
            Err(e) => failure_reply("starting automation", e),
        },
        ChatCommand::Stop => match controller.stop().await {
            Ok(accepted) => {
                let state = accepted.state;
                format!(
                    "Automation stopped\n\nDuration: {}\nProcessed: {}\nSucceeded: {}\nFailed: {}\nNext index: {}\n\nThe job in progress will finish first. Use /start_auto {} to resume.",
                    session_duration(&state),
                    state.total_processed,
                    state.success_count,
                    state.fail_count,
                    state.current_index,
                    state.current_index
                )
            }
            Err(ControlError::NoActiveRun) => "No automation is currently running.".to_string(),
            Err(e) => failure_reply("stopping automation", e),
        },
        ChatCommand::Status => match controller.status().await {
            Ok(snapshot) => {
                let state = &snapshot.state;
                format!(
                    "Pipeline status\n\nProcess: {}\nStarted: {}\nSucceeded: {}\nFailed: {}\nNext job: #{}\nETA: {}\n\nSuccess rate: {:.1}%\nTotal jobs: {}",
                    if state.is_running { "RUNNING" } else { "STOPPED" },
                    state
                        .started_at
                        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                        .unwrap_or_else(|| "N/A".to_string()),
                    state.success_count,
                    state.fail_count,
                    state.current_index + 1,
                    snapshot.eta_secs.map(format_eta).unwrap_or_else(|| "N/A".to_string()),
                    snapshot.success_rate,
                    snapshot.job_count
                )
            }
            Err(e) => failure_reply("reading status", e),
        },
        ChatCommand::Results { limit } => {
            let query = ResultQuery {
                status: None,
                limit: Some(limit.unwrap_or(DEFAULT_CHAT_LIMIT)),
                offset: None,
            };
            match controller.list_results(&query).await {
                Ok(page) if page.results.is_empty() => "No results yet.".to_string(),
                Ok(page) => {
                    let mut lines = vec![format!(
                        "Latest {} of {} results",
                        page.results.len(),
                        page.total
                    )];
                    lines.extend(page.results.iter().map(|r| match r.outcome {
                        Outcome::Success => format!(
                            "#{} ok {} ({:.0}s)",
                            r.job_index,
                            r.identity.as_deref().unwrap_or("-"),
                            r.processing_time.as_secs_f64()
                        ),
                        Outcome::Failure => format!(
                            "#{} failed: {}",
                            r.job_index,
                            r.error_detail.as_deref().unwrap_or("unknown error")
                        ),
                    }));
                    lines.join("\n")
                }
                Err(e) => failure_reply("listing results", e),
            }
        }
        ChatCommand::Logs { limit } => {
            match controller
                .recent_logs(Some(limit.unwrap_or(DEFAULT_CHAT_LIMIT)))
                .await
            {
                Ok(logs) if logs.is_empty() => "No log entries yet.".to_string(),
                Ok(logs) => logs
                    .iter()
                    .map(|entry| {
                        format!(
                            "{} [{}] {}",
                            entry.at.format("%H:%M:%S"),
                            entry.level.as_str(),
                            entry.message
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
                Err(e) => failure_reply("listing logs", e),
            }
        }
    }
}

fn failure_reply(action: &str, error: ControlError) -> String {
    tracing::error!("Chat command failed while {}: {}", action, error);
    match error {
        ControlError::Persistence(_) => {
            format!("Error {}: state store unavailable, try again later.", action)
        }
        other => format!("Error {}: {}", action, other),
    }
}

fn session_duration(state: &PipelineState) -> String {
    state
        .started_at
        .map(|started| format_elapsed((Utc::now() - started).num_seconds()))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Renders a pipeline event as a notification message
pub fn render_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::RunStarted {
            start_index,
            job_count,
        } => format!(
            "Run started at index {} ({} jobs in queue)",
            start_index, job_count
        ),
        PipelineEvent::JobStarted { index, job_count } => format!(
            "Processing job #{} ({}/{})\nStarted: {}",
            index + 1,
            index + 1,
            job_count,
            Utc::now().format("%H:%M:%S")
        ),
        PipelineEvent::JobFinished {
            result,
            state,
            job_count,
        } => match result.outcome {
            Outcome::Success => format!(
                "Job #{} succeeded\n\nIdentity: {}\nAux email: {}\nProcessing time: {:.0}s",
                result.job_index + 1,
                result.identity.as_deref().unwrap_or("-"),
                result.aux_email.as_deref().unwrap_or("-"),
                result.processing_time.as_secs_f64()
            ),
            Outcome::Failure => format!(
                "Job #{} failed\n\nError: {}\nAction: skipping to next job\n\nSucceeded: {}\nFailed: {}\nRemaining: {}",
                result.job_index + 1,
                result.error_detail.as_deref().unwrap_or("unknown error"),
                state.success_count,
                state.fail_count,
                job_count.saturating_sub(state.current_index)
            ),
        },
        PipelineEvent::RunCompleted { state } => format!(
            "Automation complete\n\nProcessed: {}\nSucceeded: {} ({:.1}%)\nFailed: {}\nDuration: {}\n\nUse /start_auto to begin a new session.",
            state.total_processed,
            state.success_count,
            state.success_rate(),
            state.fail_count,
            session_duration(state)
        ),
        PipelineEvent::RunStopped { state } => format!(
            "Run stopped at index {}. Use /start_auto {} to resume.",
            state.current_index, state.current_index
        ),
        PipelineEvent::RunAborted { state, reason } => format!(
            "Run aborted at index {}: {}\n\nUse /start_auto {} to retry.",
            state.current_index, reason, state.current_index
        ),
    }
}
