//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository defines the contract the pipeline core depends on and
//! ships the backends behind it (Postgres, file, in-memory).

pub mod job;
pub mod log;
pub mod result;
pub mod state;

// Re-export for convenience
pub use job::{JobSource, StaticJobSource};
pub use log::{LogStore, MemoryLogStore, PgLogStore};
pub use result::{MemoryResultStore, PgResultStore, ResultStore};
pub use state::{FileStateStore, MemoryStateStore, PgStateStore, StateStore};

use thiserror::Error;

/// Error raised by any storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Converts a database BIGINT into a non-negative counter
pub(crate) fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Converts a counter into a database BIGINT
pub(crate) fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
