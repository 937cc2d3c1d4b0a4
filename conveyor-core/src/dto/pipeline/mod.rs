//! Pipeline control DTOs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::state::PipelineState;

/// Request to start a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// Index of the first job to process (default 0)
    #[serde(default)]
    pub start_index: u64,
}

/// Accepted start request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub run_id: Uuid,
    pub start_index: u64,
    pub job_count: u64,
    pub message: String,
}

/// Accepted stop request, echoing the counters at the time of the stop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub state: PipelineState,
    pub message: String,
}

/// Point-in-time view of the pipeline state plus derived fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSnapshot {
    #[serde(flatten)]
    pub state: PipelineState,

    /// Number of jobs in the job source
    pub job_count: u64,

    /// Percentage of processed jobs that succeeded
    pub success_rate: f64,

    /// Estimated seconds until the remaining jobs are done; only while running
    pub eta_secs: Option<u64>,
}

impl PipelineSnapshot {
    /// Derives the snapshot from a captured state
    ///
    /// The ETA is `(job_count - current_index) * job_estimate` and is only
    /// reported while a run is active.
    pub fn new(state: PipelineState, job_count: u64, job_estimate: Duration) -> Self {
        let eta_secs = state.is_running.then(|| {
            job_count
                .saturating_sub(state.current_index)
                .saturating_mul(job_estimate.as_secs())
        });

        Self {
            success_rate: round2(state.success_rate()),
            state,
            job_count,
            eta_secs,
        }
    }

    pub fn remaining(&self) -> u64 {
        self.job_count.saturating_sub(self.state.current_index)
    }
}

/// Health report of the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// "healthy" or "unhealthy"
    pub status: String,

    /// Whether the state store answered
    pub store_reachable: bool,

    pub is_running: bool,
    pub timestamp: DateTime<Utc>,
}

/// Formats a number of seconds as "42m" or "3h 5m"
pub fn format_eta(secs: u64) -> String {
    let minutes = secs.div_ceil(60);
    if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    }
}

/// Formats an elapsed duration as "2h 14m"
pub fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
