//! Job executor
//!
//! The capability that performs one job. The pipeline only knows the
//! `JobExecutor` trait; the automation behind it is a separate service
//! reached over HTTP by `WebhookExecutor`.

use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::domain::job::{Job, JobResult, Outcome};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Fault raised while executing a job
///
/// Never leaves the worker: it is recorded as a failed `JobResult`.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("executor request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("executor rejected job ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("execution deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Other(String),
}

/// Per-call inputs passed through to the executor
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    pub static_credential: String,

    /// Instant by which the executor should give up; the pipeline never enforces it
    pub deadline: Option<Instant>,
}

impl ExecutionContext {
    pub fn new(static_credential: impl Into<String>, deadline: Option<Duration>) -> Self {
        Self {
            static_credential: static_credential.into(),
            deadline: deadline.map(|d| Instant::now() + d),
        }
    }

    /// Time left before the deadline, `None` if there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn execute(&self, job: &Job, ctx: &ExecutionContext)
    -> Result<JobResult, ExecutionError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest<'a> {
    job: &'a Job,
    static_credential: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    outcome: Outcome,
    identity: Option<String>,
    aux_email: Option<String>,
    secret: Option<String>,
    error_detail: Option<String>,
}

impl ExecuteResponse {
    fn into_result(self, job_index: u64, elapsed: Duration) -> JobResult {
        let mut result = match self.outcome {
            Outcome::Success => JobResult::success(job_index, elapsed),
            Outcome::Failure => JobResult::failure(
                job_index,
                self.error_detail
                    .unwrap_or_else(|| "executor reported failure".to_string()),
                elapsed,
            ),
        };
        result.identity = self.identity;
        result.aux_email = self.aux_email;
        result.secret = self.secret;
        result
    }
}

/// Executor that delegates each job to an HTTP endpoint
///
/// POSTs `{ "job": {...}, "staticCredential": "..." }` and expects
/// `{ "outcome": "success"|"failure", "identity"?, "auxEmail"?, "secret"?, "errorDetail"? }`.
pub struct WebhookExecutor {
    url: String,
    client: Client,
}

impl WebhookExecutor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl JobExecutor for WebhookExecutor {
    async fn execute(
        &self,
        job: &Job,
        ctx: &ExecutionContext,
    ) -> Result<JobResult, ExecutionError> {
        let started = std::time::Instant::now();

        let mut request = self.client.post(&self.url).json(&ExecuteRequest {
            job,
            static_credential: &ctx.static_credential,
        });

        if let Some(remaining) = ctx.remaining() {
            if remaining.is_zero() {
                return Err(ExecutionError::DeadlineExceeded);
            }
            request = request.timeout(remaining);
        }

        debug!("Dispatching job {} to {}", job.index, self.url);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ExecutionError::DeadlineExceeded
            } else {
                ExecutionError::Request(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ExecutionError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: ExecuteResponse = response.json().await?;

        Ok(body.into_result(job.index, started.elapsed()))
    }
}
