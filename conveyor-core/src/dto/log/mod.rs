//! Log DTOs

use serde::{Deserialize, Serialize};

use crate::domain::log::LogEntry;

pub const DEFAULT_LOG_LIMIT: u32 = 50;

/// Query parameters of the recent-logs listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogQuery {
    pub limit: Option<u32>,
}

/// Most recent log entries, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogList {
    pub logs: Vec<LogEntry>,
}
