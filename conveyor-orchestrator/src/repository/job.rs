//! Job Source
//!
//! Ordered, random-access list of jobs. The list is captured once at startup
//! and is immutable for the lifetime of the process.

use std::path::Path;

use conveyor_core::domain::job::Job;
use sqlx::PgPool;

use super::StoreError;

/// Read-only, indexed view over the jobs to process
pub trait JobSource: Send + Sync {
    /// Number of jobs
    fn len(&self) -> u64;

    /// Job at `index`, or `None` if out of range
    fn get(&self, index: u64) -> Option<Job>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Job source backed by an in-memory snapshot
#[derive(Debug, Clone, Default)]
pub struct StaticJobSource {
    jobs: Vec<Job>,
}

impl StaticJobSource {
    /// Builds the source from `(credential, secondary_credential)` pairs in order
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        let jobs = pairs
            .into_iter()
            .enumerate()
            .map(|(index, (credential, secondary))| Job::new(index as u64, credential, secondary))
            .collect();

        Self { jobs }
    }

    /// Parses `credential,secondary` lines
    ///
    /// Blank lines and lines without a comma are skipped. The secondary
    /// credential is everything after the first comma.
    pub fn parse(text: &str) -> Self {
        let pairs = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| {
                let (credential, secondary) = line.split_once(',')?;
                let credential = credential.trim();
                if credential.is_empty() {
                    return None;
                }
                Some((credential.to_string(), secondary.trim().to_string()))
            })
            .collect();

        Self::new(pairs)
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let source = Self::parse(&text);

        tracing::info!(
            "Loaded {} jobs from {}",
            source.len(),
            path.as_ref().display()
        );

        Ok(source)
    }

    /// Snapshots the active rows of the `job_source` table, in id order
    pub async fn load(pool: &PgPool) -> Result<Self, StoreError> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT credential, secondary_credential
            FROM job_source
            WHERE is_active = TRUE
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        tracing::info!("Loaded {} jobs from job_source table", rows.len());

        Ok(Self::new(rows))
    }
}

impl JobSource for StaticJobSource {
    fn len(&self) -> u64 {
        self.jobs.len() as u64
    }

    fn get(&self, index: u64) -> Option<Job> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.jobs.get(i))
            .cloned()
    }
}
