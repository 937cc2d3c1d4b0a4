//! Log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An entry of the pipeline activity log
///
/// Append-only. Written by the worker and read back by operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub related_job_index: Option<u64>,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, related_job_index: Option<u64>) -> Self {
        Self {
            level,
            message: message.into(),
            related_job_index,
            at: Utc::now(),
        }
    }

    pub fn info(message: impl Into<String>, related_job_index: Option<u64>) -> Self {
        Self::new(LogLevel::Info, message, related_job_index)
    }

    pub fn warning(message: impl Into<String>, related_job_index: Option<u64>) -> Self {
        Self::new(LogLevel::Warning, message, related_job_index)
    }

    pub fn error(message: impl Into<String>, related_job_index: Option<u64>) -> Self {
        Self::new(LogLevel::Error, message, related_job_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        }
    }

    /// Parses a stored level name, falling back to `Info` for unknown values
    pub fn parse_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}
