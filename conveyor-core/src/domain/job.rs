//! Job domain types

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of work, identified by its stable position in the job source.
///
/// Jobs are immutable once loaded. The credentials are opaque to the
/// pipeline and only forwarded to the executor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub index: u64,
    pub credential: String,
    pub secondary_credential: String,
}

impl Job {
    pub fn new(
        index: u64,
        credential: impl Into<String>,
        secondary_credential: impl Into<String>,
    ) -> Self {
        Self {
            index,
            credential: credential.into(),
            secondary_credential: secondary_credential.into(),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("index", &self.index)
            .field("credential", &self.credential)
            .field("secondary_credential", &"<redacted>")
            .finish()
    }
}

/// Classification of a single job execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[serde(alias = "successful")]
    Success,
    #[serde(alias = "failed")]
    Failure,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "success" | "successful" => Ok(Outcome::Success),
            "failure" | "failed" => Ok(Outcome::Failure),
            other => Err(format!(
                "unknown outcome '{}' (expected success or failure)",
                other
            )),
        }
    }
}

/// Result of executing one job
///
/// Produced once per execution by the executor (or by the worker when the
/// executor faults) and never mutated afterwards. `secret` is persisted with
/// the result but never serialized onto the control surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    pub job_index: u64,
    pub outcome: Outcome,
    pub identity: Option<String>,
    pub aux_email: Option<String>,
    #[serde(skip_serializing, default)]
    pub secret: Option<String>,
    #[serde(rename = "processingSecs", with = "duration_secs")]
    pub processing_time: Duration,
    pub error_detail: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl JobResult {
    /// A successful result with no identity details yet
    pub fn success(job_index: u64, processing_time: Duration) -> Self {
        Self {
            job_index,
            outcome: Outcome::Success,
            identity: None,
            aux_email: None,
            secret: None,
            processing_time,
            error_detail: None,
            completed_at: Utc::now(),
        }
    }

    /// A failed result carrying the failure detail
    pub fn failure(job_index: u64, detail: impl Into<String>, processing_time: Duration) -> Self {
        Self {
            job_index,
            outcome: Outcome::Failure,
            identity: None,
            aux_email: None,
            secret: None,
            processing_time,
            error_detail: Some(detail.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_aux_email(mut self, aux_email: impl Into<String>) -> Self {
        self.aux_email = Some(aux_email.into());
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Serializes a `Duration` as fractional seconds
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_debug_redacts_secondary_credential() {
        let job = Job::new(3, "user@example.com", "hunter2");
        let rendered = format!("{:?}", job);
        assert!(rendered.contains("user@example.com"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_outcome_parses_legacy_names() {
        assert_eq!("successful".parse::<Outcome>().unwrap(), Outcome::Success);
        assert_eq!("Failed".parse::<Outcome>().unwrap(), Outcome::Failure);
        assert!("pending".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_job_result_never_serializes_secret() {
        let result = JobResult::success(0, Duration::from_millis(1500))
            .with_identity("acct_01")
            .with_secret("TOTPSEED");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["identity"], "acct_01");
        assert_eq!(json["processingSecs"], 1.5);
        assert_eq!(json["outcome"], "success");
        assert!(json.get("secret").is_none());

        let back: JobResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.secret, None);
        assert_eq!(back.processing_time, Duration::from_millis(1500));
    }

    #[test]
    fn test_failure_carries_detail() {
        let result = JobResult::failure(7, "executor timed out", Duration::ZERO);
        assert!(!result.is_success());
        assert_eq!(result.job_index, 7);
        assert_eq!(result.error_detail.as_deref(), Some("executor timed out"));
    }
}
