//! Result Repository
//!
//! Append-only sink of job results with the listing and aggregate queries
//! behind `/api/results`.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_core::domain::job::{JobResult, Outcome};
use conveyor_core::dto::result::{ResultPage, ResultStats};
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::{StoreError, to_bigint, to_count};

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn append(&self, result: &JobResult) -> Result<(), StoreError>;

    /// Results newest first, optionally filtered by outcome
    async fn list(
        &self,
        outcome: Option<Outcome>,
        limit: u32,
        offset: u32,
    ) -> Result<ResultPage, StoreError>;

    async fn stats(&self) -> Result<ResultStats, StoreError>;
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn append(&self, result: &JobResult) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_results (job_index, outcome, identity, aux_email, secret,
                                     processing_secs, error_detail, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(to_bigint(result.job_index))
        .bind(result.outcome.as_str())
        .bind(&result.identity)
        .bind(&result.aux_email)
        .bind(&result.secret)
        .bind(result.processing_time.as_secs_f64())
        .bind(&result.error_detail)
        .bind(result.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(
        &self,
        outcome: Option<Outcome>,
        limit: u32,
        offset: u32,
    ) -> Result<ResultPage, StoreError> {
        let filter = outcome.map(|o| o.as_str());

        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT job_index, outcome, identity, aux_email, secret,
                   processing_secs, error_detail, completed_at
            FROM job_results
            WHERE ($1::TEXT IS NULL OR outcome = $1)
            ORDER BY completed_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(filter)
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_results WHERE ($1::TEXT IS NULL OR outcome = $1)",
        )
        .bind(filter)
        .fetch_one(&self.pool)
        .await?;

        let results = rows
            .into_iter()
            .map(JobResult::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResultPage {
            results,
            total: to_count(total),
            limit,
            offset,
        })
    }

    async fn stats(&self) -> Result<ResultStats, StoreError> {
        let (successful, failed, avg): (i64, i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE outcome = 'success'),
                   COUNT(*) FILTER (WHERE outcome = 'failure'),
                   AVG(processing_secs)
            FROM job_results
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ResultStats::from_counts(
            to_count(successful),
            to_count(failed),
            avg,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct ResultRow {
    job_index: i64,
    outcome: String,
    identity: Option<String>,
    aux_email: Option<String>,
    secret: Option<String>,
    processing_secs: f64,
    error_detail: Option<String>,
    completed_at: DateTime<Utc>,
}

impl TryFrom<ResultRow> for JobResult {
    type Error = StoreError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let outcome = row.outcome.parse::<Outcome>().map_err(StoreError::Corrupt)?;

        Ok(JobResult {
            job_index: to_count(row.job_index),
            outcome,
            identity: row.identity,
            aux_email: row.aux_email,
            secret: row.secret,
            processing_time: Duration::try_from_secs_f64(row.processing_secs)
                .unwrap_or_default(),
            error_detail: row.error_detail,
            completed_at: row.completed_at,
        })
    }
}

/// Results kept by `MemoryResultStore::new`
const MEMORY_RESULT_CAPACITY: usize = 10_000;

/// Result sink held in process memory
///
/// Only the newest `capacity` results can be listed; the aggregate counts
/// cover every result appended since the store was created.
pub struct MemoryResultStore {
    inner: RwLock<MemoryResults>,
    capacity: usize,
}

#[derive(Default)]
struct MemoryResults {
    recent: VecDeque<JobResult>,
    successful: u64,
    failed: u64,
    processing_secs: f64,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::with_capacity(MEMORY_RESULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(MemoryResults::default()),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryResultStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn append(&self, result: &JobResult) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;

        if result.is_success() {
            inner.successful += 1;
        } else {
            inner.failed += 1;
        }
        inner.processing_secs += result.processing_time.as_secs_f64();

        if inner.recent.len() >= self.capacity {
            inner.recent.pop_front();
        }
        inner.recent.push_back(result.clone());
        Ok(())
    }

    async fn list(
        &self,
        outcome: Option<Outcome>,
        limit: u32,
        offset: u32,
    ) -> Result<ResultPage, StoreError> {
        let inner = self.inner.read().await;

        let matching: Vec<&JobResult> = inner
            .recent
            .iter()
            .rev()
            .filter(|r| outcome.is_none_or(|o| r.outcome == o))
            .collect();

        let page = matching
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|r| (*r).clone())
            .collect();

        Ok(ResultPage {
            results: page,
            total: matching.len() as u64,
            limit,
            offset,
        })
    }

    async fn stats(&self) -> Result<ResultStats, StoreError> {
        let inner = self.inner.read().await;

        let total = inner.successful + inner.failed;
        let avg = (total > 0).then(|| inner.processing_secs / total as f64);

        Ok(ResultStats::from_counts(inner.successful, inner.failed, avg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> MemoryResultStore {
        let store = MemoryResultStore::new();
        store
            .append(&JobResult::success(0, Duration::from_secs(10)).with_identity("a"))
            .await
            .unwrap();
        store
            .append(&JobResult::failure(1, "captcha", Duration::from_secs(20)))
            .await
            .unwrap();
        store
            .append(&JobResult::success(2, Duration::from_secs(30)))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = seeded().await;

        let page = store.list(None, 10, 0).await.unwrap();
        assert_eq!(page.total, 3);
        let indexes: Vec<u64> = page.results.iter().map(|r| r.job_index).collect();
        assert_eq!(indexes, vec![2, 1, 0]);
    }

    #[tokio::test]
    async fn test_list_filter_and_paging() {
        let store = seeded().await;

        let page = store.list(Some(Outcome::Success), 1, 1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].job_index, 0);

        let failures = store.list(Some(Outcome::Failure), 10, 0).await.unwrap();
        assert_eq!(failures.total, 1);
        assert_eq!(failures.results[0].error_detail.as_deref(), Some("captcha"));
    }

    #[tokio::test]
    async fn test_stats() {
        let store = seeded().await;

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.avg_processing_secs, 20.0);
        assert_eq!(stats.success_rate, 66.67);
    }

    #[tokio::test]
    async fn test_capacity_bounds_listing_but_not_stats() {
        let store = MemoryResultStore::with_capacity(2);
        for i in 0..4u64 {
            let result = if i % 2 == 0 {
                JobResult::success(i, Duration::from_secs(10))
            } else {
                JobResult::failure(i, "captcha", Duration::from_secs(30))
            };
            store.append(&result).await.unwrap();
        }

        let page = store.list(None, 10, 0).await.unwrap();
        assert_eq!(page.total, 2);
        let indexes: Vec<u64> = page.results.iter().map(|r| r.job_index).collect();
        assert_eq!(indexes, vec![3, 2]);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.successful, 2);
        assert_eq!(stats.avg_processing_secs, 20.0);
    }

    #[test]
    fn test_row_with_unknown_outcome_is_corrupt() {
        let row = ResultRow {
            job_index: 0,
            outcome: "maybe".to_string(),
            identity: None,
            aux_email: None,
            secret: None,
            processing_secs: 1.0,
            error_detail: None,
            completed_at: Utc::now(),
        };

        assert!(matches!(
            JobResult::try_from(row),
            Err(StoreError::Corrupt(_))
        ));
    }
}
