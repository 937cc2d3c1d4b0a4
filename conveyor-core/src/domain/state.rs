//! Pipeline state domain types
//!
//! `PipelineState` is the single durable progress record of a pipeline
//! instance. Every persisted write keeps `total_processed` equal to
//! `success_count + fail_count`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::Outcome;

/// Durable progress record of the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    pub is_running: bool,
    pub current_index: u64,
    pub total_processed: u64,
    pub success_count: u64,
    pub fail_count: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl PipelineState {
    /// The zero-value record used when nothing has been persisted yet
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            is_running: false,
            current_index: 0,
            total_processed: 0,
            success_count: 0,
            fail_count: 0,
            started_at: None,
            last_updated: now,
        }
    }

    /// Applies a partial update and stamps `last_updated`
    pub fn apply(&mut self, patch: &StatePatch, now: DateTime<Utc>) {
        if let Some(is_running) = patch.is_running {
            self.is_running = is_running;
        }
        if let Some(current_index) = patch.current_index {
            self.current_index = current_index;
        }
        if let Some(total_processed) = patch.total_processed {
            self.total_processed = total_processed;
        }
        if let Some(success_count) = patch.success_count {
            self.success_count = success_count;
        }
        if let Some(fail_count) = patch.fail_count {
            self.fail_count = fail_count;
        }
        if let Some(started_at) = patch.started_at {
            self.started_at = Some(started_at);
        }
        self.last_updated = now;
    }

    /// Folds the outcome of job `index` into the counters and advances past it
    pub fn record(&mut self, index: u64, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.success_count += 1,
            Outcome::Failure => self.fail_count += 1,
        }
        self.total_processed += 1;
        self.current_index = index.saturating_add(1);
    }

    pub fn is_consistent(&self) -> bool {
        self.total_processed == self.success_count + self.fail_count
    }

    /// Success percentage over processed jobs, 0 when nothing was processed
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.success_count as f64 / self.total_processed as f64 * 100.0
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::initial(Utc::now())
    }
}

/// Partial update of the pipeline state
///
/// Absent fields are left untouched by a merge. `last_updated` is not part of
/// the patch: the store stamps it on every merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    pub is_running: Option<bool>,
    pub current_index: Option<u64>,
    pub total_processed: Option<u64>,
    pub success_count: Option<u64>,
    pub fail_count: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl StatePatch {
    /// Marks a run as started at `index`
    pub fn started(index: u64, now: DateTime<Utc>) -> Self {
        Self {
            is_running: Some(true),
            current_index: Some(index),
            started_at: Some(now),
            ..Self::default()
        }
    }

    pub fn stopped() -> Self {
        Self {
            is_running: Some(false),
            ..Self::default()
        }
    }

    /// Progress fields of `state`; leaves `is_running` alone
    pub fn progress(state: &PipelineState) -> Self {
        Self {
            current_index: Some(state.current_index),
            total_processed: Some(state.total_processed),
            success_count: Some(state.success_count),
            fail_count: Some(state.fail_count),
            ..Self::default()
        }
    }

    /// Progress fields of `state` together with a cleared running flag
    pub fn finished(state: &PipelineState) -> Self {
        Self {
            is_running: Some(false),
            ..Self::progress(state)
        }
    }
}
