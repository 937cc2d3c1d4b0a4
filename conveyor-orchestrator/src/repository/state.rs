//! State Repository
//!
//! Durable storage of the single `PipelineState` record.
//!
//! Every backend honors the same contract: `get` never fails for a missing
//! record (it yields the zero-value default), and `merge` applies a partial
//! update atomically and stamps `last_updated`. Readers always observe a
//! complete record, never a half-applied merge.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use conveyor_core::domain::state::{PipelineState, StatePatch};
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};

use super::{StoreError, to_bigint, to_count};

/// Well-known key of the pipeline's state record
pub const STATE_KEY: &str = "default";

/// Durable record of pipeline progress
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the current record, or the zero-value default if none exists
    async fn get(&self) -> Result<PipelineState, StoreError>;

    /// Atomically applies the given fields and returns the resulting record
    async fn merge(&self, patch: StatePatch) -> Result<PipelineState, StoreError>;

    /// Replaces the record with the zero-value default
    async fn reset(&self) -> Result<PipelineState, StoreError>;
}

// =============================================================================
// Postgres
// =============================================================================

/// State record kept in the `pipeline_state` table
pub struct PgStateStore {
    pool: PgPool,
    key: String,
}

impl PgStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            key: STATE_KEY.to_string(),
        }
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    async fn get(&self) -> Result<PipelineState, StoreError> {
        // Create the record lazily so later merges always hit an existing row
        sqlx::query("INSERT INTO pipeline_state (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(&self.key)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query_as::<_, StateRow>(
            r#"
            SELECT is_running, current_index, total_processed, success_count,
                   fail_count, started_at, last_updated
            FROM pipeline_state
            WHERE id = $1
            "#,
        )
        .bind(&self.key)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn merge(&self, patch: StatePatch) -> Result<PipelineState, StoreError> {
        let row = sqlx::query_as::<_, StateRow>(
            r#"
            INSERT INTO pipeline_state (id, is_running, current_index, total_processed,
                                        success_count, fail_count, started_at, last_updated)
            VALUES ($1, COALESCE($2, FALSE), COALESCE($3, 0), COALESCE($4, 0),
                    COALESCE($5, 0), COALESCE($6, 0), $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                is_running = COALESCE($2, pipeline_state.is_running),
                current_index = COALESCE($3, pipeline_state.current_index),
                total_processed = COALESCE($4, pipeline_state.total_processed),
                success_count = COALESCE($5, pipeline_state.success_count),
                fail_count = COALESCE($6, pipeline_state.fail_count),
                started_at = COALESCE($7, pipeline_state.started_at),
                last_updated = $8
            RETURNING is_running, current_index, total_processed, success_count,
                      fail_count, started_at, last_updated
            "#,
        )
        .bind(&self.key)
        .bind(patch.is_running)
        .bind(patch.current_index.map(to_bigint))
        .bind(patch.total_processed.map(to_bigint))
        .bind(patch.success_count.map(to_bigint))
        .bind(patch.fail_count.map(to_bigint))
        .bind(patch.started_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn reset(&self) -> Result<PipelineState, StoreError> {
        let row = sqlx::query_as::<_, StateRow>(
            r#"
            INSERT INTO pipeline_state (id, last_updated)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET
                is_running = FALSE,
                current_index = 0,
                total_processed = 0,
                success_count = 0,
                fail_count = 0,
                started_at = NULL,
                last_updated = $2
            RETURNING is_running, current_index, total_processed, success_count,
                      fail_count, started_at, last_updated
            "#,
        )
        .bind(&self.key)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[derive(sqlx::FromRow)]
struct StateRow {
    is_running: bool,
    current_index: i64,
    total_processed: i64,
    success_count: i64,
    fail_count: i64,
    started_at: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
}

impl From<StateRow> for PipelineState {
    fn from(row: StateRow) -> Self {
        PipelineState {
            is_running: row.is_running,
            current_index: to_count(row.current_index),
            total_processed: to_count(row.total_processed),
            success_count: to_count(row.success_count),
            fail_count: to_count(row.fail_count),
            started_at: row.started_at,
            last_updated: row.last_updated,
        }
    }
}

// =============================================================================
// JSON file
// =============================================================================

/// State record kept in a JSON document on local disk
///
/// Writes go to a temp file that is then renamed over the document, so the
/// file on disk is never partially written. Merges are serialized by
/// `write_lock`; readers are served from `cached` and never wait on disk I/O.
pub struct FileStateStore {
    path: PathBuf,
    cached: RwLock<PipelineState>,
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Opens the document at `path`, starting from the default if it does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<PipelineState>(&bytes).map_err(|e| {
                StoreError::Corrupt(format!("{}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, starting fresh", path.display());
                PipelineState::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            cached: RwLock::new(state),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &PipelineState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "state.json".to_string());
        let tmp_path = self.path.with_file_name(format!("{}.tmp", file_name));

        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Corrupt(format!("cannot encode state: {}", e)))?;

        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        Ok(())
    }

    async fn replace_with(
        &self,
        update: impl FnOnce(&mut PipelineState),
    ) -> Result<PipelineState, StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut next = self.cached.read().await.clone();
        update(&mut next);

        self.persist(&next).await?;
        *self.cached.write().await = next.clone();

        Ok(next)
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get(&self) -> Result<PipelineState, StoreError> {
        Ok(self.cached.read().await.clone())
    }

    async fn merge(&self, patch: StatePatch) -> Result<PipelineState, StoreError> {
        self.replace_with(|state| state.apply(&patch, Utc::now()))
            .await
    }

    async fn reset(&self) -> Result<PipelineState, StoreError> {
        self.replace_with(|state| *state = PipelineState::initial(Utc::now()))
            .await
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// State record held in process memory; lost on restart
#[derive(Default)]
pub struct MemoryStateStore {
    state: RwLock<PipelineState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PipelineState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self) -> Result<PipelineState, StoreError> {
        Ok(self.state.read().await.clone())
    }

    async fn merge(&self, patch: StatePatch) -> Result<PipelineState, StoreError> {
        let mut state = self.state.write().await;
        state.apply(&patch, Utc::now());
        Ok(state.clone())
    }

    async fn reset(&self) -> Result<PipelineState, StoreError> {
        let mut state = self.state.write().await;
        *state = PipelineState::initial(Utc::now());
        Ok(state.clone())
    }
}
