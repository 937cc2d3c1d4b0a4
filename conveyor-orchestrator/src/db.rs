use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Single progress record, keyed by a well-known id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_state (
            id VARCHAR(64) PRIMARY KEY,
            is_running BOOLEAN NOT NULL DEFAULT FALSE,
            current_index BIGINT NOT NULL DEFAULT 0 CHECK (current_index >= 0),
            total_processed BIGINT NOT NULL DEFAULT 0,
            success_count BIGINT NOT NULL DEFAULT 0,
            fail_count BIGINT NOT NULL DEFAULT 0,
            started_at TIMESTAMPTZ,
            last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CHECK (total_processed = success_count + fail_count)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Queue of jobs; read once at startup in id order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_source (
            id BIGSERIAL PRIMARY KEY,
            credential VARCHAR(255) NOT NULL UNIQUE,
            secondary_credential TEXT NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS job_results (
            id BIGSERIAL PRIMARY KEY,
            job_index BIGINT NOT NULL,
            outcome VARCHAR(20) NOT NULL,
            identity VARCHAR(255),
            aux_email VARCHAR(255),
            secret TEXT,
            processing_secs DOUBLE PRECISION NOT NULL,
            error_detail TEXT,
            completed_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_logs (
            id BIGSERIAL PRIMARY KEY,
            level VARCHAR(20) NOT NULL,
            message TEXT NOT NULL,
            job_index BIGINT,
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for the listing endpoints
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_job_results_outcome ON job_results(outcome)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_job_results_completed_at ON job_results(completed_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_logs_created_at ON pipeline_logs(created_at DESC)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
