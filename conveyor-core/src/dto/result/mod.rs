//! Job result DTOs

use serde::{Deserialize, Serialize};

use crate::domain::job::{JobResult, Outcome};
use crate::dto::pipeline::round2;

pub const DEFAULT_RESULT_LIMIT: u32 = 100;

/// Upper bound for any page size requested through the control API
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// Query parameters of the result listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultQuery {
    pub status: Option<Outcome>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// One page of stored job results, newest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultPage {
    pub results: Vec<JobResult>,

    /// Number of results matching the filter, across all pages
    pub total: u64,

    pub limit: u32,
    pub offset: u32,
}

/// Aggregate over all stored job results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub avg_processing_secs: f64,
}

impl ResultStats {
    pub fn from_counts(successful: u64, failed: u64, avg_processing_secs: Option<f64>) -> Self {
        let total = successful + failed;
        let success_rate = if total == 0 {
            0.0
        } else {
            successful as f64 / total as f64 * 100.0
        };

        Self {
            total,
            successful,
            failed,
            success_rate: round2(success_rate),
            avg_processing_secs: round2(avg_processing_secs.unwrap_or(0.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_counts() {
        let stats = ResultStats::from_counts(3, 1, Some(12.345));
        assert_eq!(stats.total, 4);
        assert_eq!(stats.success_rate, 75.0);
        assert_eq!(stats.avg_processing_secs, 12.35);
    }

    #[test]
    fn test_stats_empty() {
        let stats = ResultStats::from_counts(0, 0, None);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.avg_processing_secs, 0.0);
    }

    #[test]
    fn test_query_accepts_legacy_status_names() {
        let query: ResultQuery =
            serde_json::from_str(r#"{"status": "failed", "limit": 10}"#).unwrap();
        assert_eq!(query.status, Some(Outcome::Failure));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, None);
    }
}
