//! Log Repository

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_core::domain::log::{LogEntry, LogLevel};
use conveyor_core::dto::result::MAX_PAGE_LIMIT;
use sqlx::PgPool;
use tokio::sync::RwLock;

use super::{StoreError, to_bigint, to_count};

/// Append-only activity log
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError>;

    /// Most recent entries, newest first
    async fn recent(&self, limit: u32) -> Result<Vec<LogEntry>, StoreError>;
}

pub struct PgLogStore {
    pool: PgPool,
}

impl PgLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LogStore for PgLogStore {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO pipeline_logs (level, message, job_index, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .bind(entry.related_job_index.map(to_bigint))
        .bind(entry.at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<LogEntry>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, Option<i64>, DateTime<Utc>)>(
            r#"
            SELECT level, message, job_index, created_at
            FROM pipeline_logs
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(level, message, job_index, at)| LogEntry {
                level: LogLevel::parse_lossy(&level),
                message,
                related_job_index: job_index.map(to_count),
                at,
            })
            .collect())
    }
}

/// Activity log held in process memory, keeping the newest `capacity` entries
pub struct MemoryLogStore {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl MemoryLogStore {
    /// Keeps as many entries as a single listing can return
    pub fn new() -> Self {
        Self::with_capacity(MAX_PAGE_LIMIT as usize)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: LogEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
