use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod chat;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

use config::Config;
use repository::{
    FileStateStore, JobSource, LogStore, MemoryLogStore, MemoryResultStore, PgLogStore,
    PgResultStore, PgStateStore, ResultStore, StateStore, StaticJobSource,
};
use service::{
    Notifier, NullNotifier, PipelineComponents, PipelineController, RecoveryOutcome,
    WebhookExecutor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conveyor_orchestrator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Conveyor Orchestrator...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    tracing::debug!("Configuration: {:?}", config);

    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(url, config.db_pool_size, config.db_pool_timeout)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Some(pool)
        }
        None => None,
    };

    // Storage backends
    let (store, results, logs): (Arc<dyn StateStore>, Arc<dyn ResultStore>, Arc<dyn LogStore>) =
        match &pool {
            Some(pool) => (
                Arc::new(PgStateStore::new(pool.clone())),
                Arc::new(PgResultStore::new(pool.clone())),
                Arc::new(PgLogStore::new(pool.clone())),
            ),
            None => {
                let store = FileStateStore::open(&config.state_file)
                    .await
                    .context("Failed to open state file")?;
                tracing::info!(
                    "No DATABASE_URL set, keeping state in {}",
                    store.path().display()
                );
                (
                    Arc::new(store),
                    Arc::new(MemoryResultStore::new()),
                    Arc::new(MemoryLogStore::new()),
                )
            }
        };

    // Job source snapshot
    let source = match (&config.jobs_file, &pool) {
        (Some(path), _) => StaticJobSource::from_file(path)
            .await
            .with_context(|| format!("Failed to read jobs file {}", path.display()))?,
        (None, Some(pool)) => StaticJobSource::load(pool)
            .await
            .context("Failed to load job source")?,
        (None, None) => bail!("No job source: set JOBS_FILE or DATABASE_URL"),
    };

    if source.is_empty() {
        tracing::warn!("Job source is empty; start requests will be rejected");
    }

    let telegram = config
        .telegram
        .as_ref()
        .map(|t| chat::telegram::TelegramClient::new(&t.bot_token));

    let notify_chat = config.telegram.as_ref().and_then(|t| t.notify_chat);
    let notifier: Arc<dyn Notifier> = match (&telegram, notify_chat) {
        (Some(client), Some(chat_id)) => Arc::new(chat::ChatNotifier::new(client.clone(), chat_id)),
        _ => Arc::new(NullNotifier),
    };

    let executor = WebhookExecutor::new(&config.executor_url);
    tracing::info!("Jobs are dispatched to {}", executor.url());

    let controller = Arc::new(PipelineController::new(
        PipelineComponents {
            store,
            source: Arc::new(source),
            executor: Arc::new(executor),
            results,
            logs,
            notifier,
        },
        config.pipeline_settings(),
    ));

    tracing::info!(
        "Pipeline ready with {} jobs (inter-job delay {:?})",
        controller.job_count(),
        controller.settings().inter_job_delay
    );

    match controller
        .recover(config.auto_resume)
        .await
        .context("Failed to recover pipeline state")?
    {
        RecoveryOutcome::Clean => {}
        RecoveryOutcome::Cleared { index } => {
            tracing::warn!(
                "Cleared stale running flag; resume with a start at index {}",
                index
            );
        }
        RecoveryOutcome::Resumed { index } => {
            tracing::info!("Resumed interrupted run at index {}", index);
        }
    }

    let shutdown = CancellationToken::new();

    let bot_handle = match (telegram, config.telegram.as_ref()) {
        (Some(client), Some(t)) => {
            let bot = chat::ChatBot::new(client, Arc::clone(&controller), t.allowed_chats.clone());
            Some(tokio::spawn(bot.run(shutdown.clone())))
        }
        _ => None,
    };

    // Build router with all API endpoints
    let cors = api::cors_layer(config.dashboard_origin.as_deref())?;
    let app = api::create_router(Arc::clone(&controller), cors, &config.rate_limits);

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    let server_shutdown = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    shutdown.cancel();
    controller.shutdown().await;

    if let Some(handle) = bot_handle {
        let _ = handle.await;
    }

    tracing::info!("Conveyor Orchestrator stopped");
    Ok(())
}
