//! Pipeline controller
//!
//! Single entry point for every mutation of the pipeline. Control adapters
//! (HTTP routes, chat commands) call into one shared `PipelineController`
//! and never touch the state store directly.
//!
//! The controller keeps an in-memory slot for the active run. The slot is
//! checked and filled under one lock together with the persistence write and
//! the spawn, so two concurrent `start` calls can never both spawn a worker.
//! The slot is only cleared once the worker task has exited, which means a
//! `start` issued after `stop` but before the in-flight job finished is still
//! refused with `AlreadyRunning`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use conveyor_core::domain::log::{LogEntry, LogLevel};
use conveyor_core::domain::state::{PipelineState, StatePatch};
use conveyor_core::dto::log::DEFAULT_LOG_LIMIT;
use conveyor_core::dto::pipeline::PipelineSnapshot;
use conveyor_core::dto::result::{
    DEFAULT_RESULT_LIMIT, MAX_PAGE_LIMIT, ResultPage, ResultQuery, ResultStats,
};
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::repository::{JobSource, LogStore, ResultStore, StateStore, StoreError};
use crate::service::executor::JobExecutor;
use crate::service::notify::Notifier;
use crate::service::worker::{RunEnd, RunSummary, Worker};

/// Collaborators shared by the controller and its workers
#[derive(Clone)]
pub struct PipelineComponents {
    pub store: Arc<dyn StateStore>,
    pub source: Arc<dyn JobSource>,
    pub executor: Arc<dyn JobExecutor>,
    pub results: Arc<dyn ResultStore>,
    pub logs: Arc<dyn LogStore>,
    pub notifier: Arc<dyn Notifier>,
}

/// Pacing and pass-through inputs of a run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Pause between two consecutive jobs
    pub inter_job_delay: Duration,

    /// Per-job duration used for the ETA
    pub job_estimate: Duration,

    /// Optional deadline handed to the executor
    pub job_deadline: Option<Duration>,

    /// Credential handed to the executor with every job
    pub static_credential: String,
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("pipeline is already running")]
    AlreadyRunning,

    #[error("start index {index} is out of range (job source has {job_count} jobs)")]
    IndexOutOfRange { index: u64, job_count: u64 },

    #[error("no active run")]
    NoActiveRun,

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl ControlError {
    /// Stable machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::AlreadyRunning => "already_running",
            ControlError::IndexOutOfRange { .. } => "index_out_of_range",
            ControlError::NoActiveRun => "no_active_run",
            ControlError::Persistence(_) => "persistence",
        }
    }
}

/// Accepted start request
#[derive(Debug)]
pub struct StartAccepted {
    pub run_id: Uuid,
    pub start_index: u64,
    pub job_count: u64,
    pub completion: RunCompletion,
}

/// Accepted stop request
#[derive(Debug, Clone)]
pub struct StopAccepted {
    pub run_id: Uuid,

    /// Persisted state right after the stop; counters may still advance once
    /// if a job was in flight
    pub state: PipelineState,
}

/// What `recover` found at process start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Nothing to recover
    Clean,
    /// A stale running flag was cleared
    Cleared { index: u64 },
    /// A stale run was resumed from its persisted index
    Resumed { index: u64 },
}

/// Handle that resolves when a run's worker has exited
#[derive(Debug, Clone)]
pub struct RunCompletion(watch::Receiver<Option<RunSummary>>);

impl RunCompletion {
    /// Waits for the run to end; `None` if its supervisor went away
    pub async fn wait(mut self) -> Option<RunSummary> {
        let summary = self.0.wait_for(Option::is_some).await.ok()?;
        summary.clone()
    }
}

struct ActiveRun {
    run_id: Uuid,
    cancel: CancellationToken,
    done: watch::Receiver<Option<RunSummary>>,
}

pub struct PipelineController {
    components: PipelineComponents,
    settings: PipelineSettings,
    active: Arc<Mutex<Option<ActiveRun>>>,
}

impl PipelineController {
    pub fn new(components: PipelineComponents, settings: PipelineSettings) -> Self {
        Self {
            components,
            settings,
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn job_count(&self) -> u64 {
        self.components.source.len()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Starts a run at `index`
    pub async fn start(&self, index: u64) -> Result<StartAccepted, ControlError> {
        let mut active = self.active.lock().await;

        if active.is_some() {
            return Err(ControlError::AlreadyRunning);
        }

        let job_count = self.components.source.len();
        if index >= job_count {
            return Err(ControlError::IndexOutOfRange { index, job_count });
        }

        let state = self
            .components
            .store
            .merge(StatePatch::started(index, Utc::now()))
            .await?;

        let run_id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = watch::channel(None);

        let worker = Worker::new(
            run_id,
            index,
            state,
            self.components.clone(),
            self.settings.clone(),
            cancel.clone(),
        );
        let handle = tokio::spawn(worker.run());

        // Supervisor: releases the slot once the worker is gone, however it ended
        let slot = Arc::clone(&self.active);
        let store = Arc::clone(&self.components.store);
        tokio::spawn(async move {
            let summary = match handle.await {
                Ok(summary) => summary,
                Err(e) => {
                    error!("Worker of run {} terminated abnormally: {}", run_id, e);
                    let state = match store.merge(StatePatch::stopped()).await {
                        Ok(state) => state,
                        Err(e) => {
                            error!("Failed to clear running flag of run {}: {}", run_id, e);
                            PipelineState::default()
                        }
                    };
                    RunSummary {
                        run_id,
                        end: RunEnd::Aborted,
                        state,
                    }
                }
            };

            {
                let mut active = slot.lock().await;
                if active.as_ref().is_some_and(|run| run.run_id == run_id) {
                    *active = None;
                }
            }

            let _ = done_tx.send(Some(summary));
        });

        *active = Some(ActiveRun {
            run_id,
            cancel,
            done: done_rx.clone(),
        });

        info!("Accepted run {} at index {} of {}", run_id, index, job_count);

        Ok(StartAccepted {
            run_id,
            start_index: index,
            job_count,
            completion: RunCompletion(done_rx),
        })
    }

    /// Requests the active run to stop at its next job boundary
    pub async fn stop(&self) -> Result<StopAccepted, ControlError> {
        let active = self.active.lock().await;
        let run = active.as_ref().ok_or(ControlError::NoActiveRun)?;

        run.cancel.cancel();
        let state = self.components.store.merge(StatePatch::stopped()).await?;

        info!(
            "Stop requested for run {} at index {}",
            run.run_id, state.current_index
        );

        Ok(StopAccepted {
            run_id: run.run_id,
            state,
        })
    }

    /// Captures the persisted state plus derived fields
    pub async fn status(&self) -> Result<PipelineSnapshot, ControlError> {
        let state = self.components.store.get().await?;

        Ok(PipelineSnapshot::new(
            state,
            self.components.source.len(),
            self.settings.job_estimate,
        ))
    }

    /// Zeroes the persisted state; refused while a run is active
    pub async fn reset(&self) -> Result<PipelineState, ControlError> {
        let active = self.active.lock().await;
        if active.is_some() {
            return Err(ControlError::AlreadyRunning);
        }

        let state = self.components.store.reset().await?;
        drop(active);

        info!("Pipeline state reset");
        self.append_log(LogEntry::new(LogLevel::Warning, "Pipeline state reset", None))
            .await;

        Ok(state)
    }

    /// Reconciles a persisted running flag left behind by a previous process
    pub async fn recover(&self, auto_resume: bool) -> Result<RecoveryOutcome, ControlError> {
        let state = self.components.store.get().await?;

        if !state.is_running || self.is_active().await {
            return Ok(RecoveryOutcome::Clean);
        }

        let index = state.current_index;
        warn!(
            "Found stale running flag at index {}; no worker is active",
            index
        );

        self.components.store.merge(StatePatch::stopped()).await?;
        self.append_log(LogEntry::warning(
            format!("Recovered interrupted run at index {}", index),
            None,
        ))
        .await;

        if auto_resume && index < self.components.source.len() {
            info!("Resuming interrupted run at index {}", index);
            self.start(index).await?;
            return Ok(RecoveryOutcome::Resumed { index });
        }

        Ok(RecoveryOutcome::Cleared { index })
    }

    /// Cancels the active run, if any, and waits for its worker to exit
    pub async fn shutdown(&self) {
        let completion = {
            let active = self.active.lock().await;
            match active.as_ref() {
                Some(run) => {
                    run.cancel.cancel();
                    RunCompletion(run.done.clone())
                }
                None => return,
            }
        };

        info!("Waiting for the active run to reach a job boundary");
        if let Some(summary) = completion.wait().await {
            info!(
                "Run {} ended at index {}",
                summary.run_id, summary.state.current_index
            );
        }
    }

    pub async fn is_active(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Completion handle of the active run
    pub async fn completion(&self) -> Option<RunCompletion> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|run| RunCompletion(run.done.clone()))
    }

    pub async fn list_results(&self, query: &ResultQuery) -> Result<ResultPage, ControlError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_RESULT_LIMIT)
            .min(MAX_PAGE_LIMIT);
        let offset = query.offset.unwrap_or(0);

        Ok(self
            .components
            .results
            .list(query.status, limit, offset)
            .await?)
    }

    pub async fn result_stats(&self) -> Result<ResultStats, ControlError> {
        Ok(self.components.results.stats().await?)
    }

    pub async fn recent_logs(&self, limit: Option<u32>) -> Result<Vec<LogEntry>, ControlError> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT).min(MAX_PAGE_LIMIT);
        Ok(self.components.logs.recent(limit).await?)
    }

    async fn append_log(&self, entry: LogEntry) {
        if let Err(e) = self.components.logs.append(entry).await {
            warn!("Failed to append pipeline log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use conveyor_core::domain::job::{Job, JobResult, Outcome};
    use tokio::task::JoinSet;

    use super::*;
    use crate::repository::{
        MemoryLogStore, MemoryResultStore, MemoryStateStore, StaticJobSource,
    };
    use crate::service::executor::testing::ScriptedExecutor;
    use crate::service::executor::{ExecutionContext, ExecutionError};
    use crate::service::notify::NullNotifier;

    fn settings(inter_job_delay: Duration) -> PipelineSettings {
        PipelineSettings {
            inter_job_delay,
            job_estimate: Duration::from_secs(300),
            job_deadline: None,
            static_credential: "static".to_string(),
        }
    }

    fn build(
        jobs: usize,
        executor: Arc<dyn JobExecutor>,
        store: Arc<MemoryStateStore>,
        inter_job_delay: Duration,
    ) -> PipelineController {
        let source = StaticJobSource::new(
            (0..jobs)
                .map(|i| (format!("job{}", i), "pw".to_string()))
                .collect(),
        );

        PipelineController::new(
            PipelineComponents {
                store,
                source: Arc::new(source),
                executor,
                results: Arc::new(MemoryResultStore::new()),
                logs: Arc::new(MemoryLogStore::new()),
                notifier: Arc::new(NullNotifier),
            },
            settings(inter_job_delay),
        )
    }

    fn paced(jobs: usize, executor: Arc<ScriptedExecutor>) -> PipelineController {
        build(
            jobs,
            executor,
            Arc::new(MemoryStateStore::new()),
            Duration::from_secs(30),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_runs_to_completion() {
        let executor = Arc::new(ScriptedExecutor::failing([1]));
        let controller = paced(3, executor.clone());

        let accepted = controller.start(0).await.unwrap();
        assert_eq!(accepted.start_index, 0);
        assert_eq!(accepted.job_count, 3);

        let summary = accepted.completion.wait().await.unwrap();
        assert_eq!(summary.end, RunEnd::Completed);

        let snapshot = controller.status().await.unwrap();
        assert!(!snapshot.state.is_running);
        assert_eq!(snapshot.state.current_index, 3);
        assert_eq!(snapshot.state.total_processed, 3);
        assert_eq!(snapshot.state.success_count, 2);
        assert_eq!(snapshot.state.fail_count, 1);
        assert_eq!(snapshot.eta_secs, None);
        assert!(!controller.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_is_refused() {
        let executor = Arc::new(ScriptedExecutor::succeeding().with_delay(Duration::from_secs(5)));
        let controller = paced(3, executor.clone());

        let accepted = controller.start(0).await.unwrap();
        let before = controller.status().await.unwrap().state;

        let second = controller.start(0).await;
        assert!(matches!(second, Err(ControlError::AlreadyRunning)));
        assert_eq!(controller.status().await.unwrap().state, before);

        accepted.completion.wait().await.unwrap();
        assert_eq!(executor.call_count(), 3);
        assert_eq!(executor.executed(), vec![0, 1, 2]);
        assert_eq!(controller.status().await.unwrap().state.total_processed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_out_of_range_leaves_state_unchanged() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = paced(3, executor.clone());
        let before = controller.status().await.unwrap().state;

        for index in [3, 5] {
            let err = controller.start(index).await.unwrap_err();
            assert!(matches!(
                err,
                ControlError::IndexOutOfRange { job_count: 3, .. }
            ));
            assert_eq!(err.kind(), "index_out_of_range");
        }

        assert_eq!(controller.status().await.unwrap().state, before);
        assert!(!controller.is_active().await);
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_resume_without_reprocessing() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = paced(3, executor.clone());

        let accepted = controller.start(0).await.unwrap();

        // Job 0 runs immediately; the worker is now inside its 30s pause
        tokio::time::sleep(Duration::from_secs(10)).await;
        let stopped = controller.stop().await.unwrap();
        assert!(!stopped.state.is_running);
        assert_eq!(stopped.run_id, accepted.run_id);

        let summary = accepted.completion.wait().await.unwrap();
        assert_eq!(summary.end, RunEnd::Cancelled);

        let state = controller.status().await.unwrap().state;
        assert!(!state.is_running);
        assert_eq!(state.current_index, 1);

        let resumed = controller.start(state.current_index).await.unwrap();
        resumed.completion.wait().await.unwrap();

        assert_eq!(executor.executed(), vec![0, 1, 2]);
        let state = controller.status().await.unwrap().state;
        assert_eq!(state.current_index, 3);
        assert_eq!(state.total_processed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_in_flight_job_finish() {
        let executor = Arc::new(ScriptedExecutor::succeeding().with_delay(Duration::from_secs(60)));
        let controller = paced(3, executor.clone());

        let accepted = controller.start(0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        controller.stop().await.unwrap();

        // Still stopping: the slot is held until the worker exits
        assert!(matches!(
            controller.start(0).await,
            Err(ControlError::AlreadyRunning)
        ));
        // Repeated stop while stopping is accepted
        controller.stop().await.unwrap();

        let summary = accepted.completion.wait().await.unwrap();
        assert_eq!(summary.end, RunEnd::Cancelled);
        assert_eq!(summary.state.current_index, 1);
        assert_eq!(executor.executed(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_run() {
        let controller = paced(3, Arc::new(ScriptedExecutor::succeeding()));

        let err = controller.stop().await.unwrap_err();
        assert!(matches!(err, ControlError::NoActiveRun));
        assert_eq!(err.kind(), "no_active_run");
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_executor_completes() {
        let executor = Arc::new(ScriptedExecutor::failing(0..5));
        let controller = paced(5, executor);

        let summary = controller.start(0).await.unwrap().completion.wait().await.unwrap();

        assert_eq!(summary.end, RunEnd::Completed);
        let state = controller.status().await.unwrap().state;
        assert_eq!(state.fail_count, 5);
        assert_eq!(state.success_count, 0);
        assert_eq!(state.current_index, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counters_accumulate_across_runs() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = paced(2, executor);

        controller.start(0).await.unwrap().completion.wait().await;
        controller.start(1).await.unwrap().completion.wait().await;

        let state = controller.status().await.unwrap().state;
        assert_eq!(state.total_processed, 3);
        assert_eq!(state.current_index, 2);
        assert!(state.is_consistent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_status_reads_are_consistent() {
        let executor = Arc::new(ScriptedExecutor::failing([2, 5, 7]));
        let controller = Arc::new(build(
            20,
            executor,
            Arc::new(MemoryStateStore::new()),
            Duration::from_millis(1),
        ));

        let accepted = controller.start(0).await.unwrap();

        let mut readers = JoinSet::new();
        for _ in 0..4 {
            let controller = Arc::clone(&controller);
            readers.spawn(async move {
                let mut observed = 0;
                while controller.is_active().await {
                    let snapshot = controller.status().await.unwrap();
                    assert!(snapshot.state.is_consistent());
                    observed += 1;
                    tokio::task::yield_now().await;
                }
                observed
            });
        }

        accepted.completion.wait().await.unwrap();
        while let Some(observed) = readers.join_next().await {
            observed.unwrap();
        }

        let state = controller.status().await.unwrap().state;
        assert_eq!(state.total_processed, 20);
        assert_eq!(state.fail_count, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_spawn_one_worker() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = Arc::new(build(
            3,
            executor.clone(),
            Arc::new(MemoryStateStore::new()),
            Duration::from_millis(1),
        ));

        let mut starts = JoinSet::new();
        for _ in 0..8 {
            let controller = Arc::clone(&controller);
            starts.spawn(async move { controller.start(0).await });
        }

        let mut accepted = Vec::new();
        let mut refused = 0;
        while let Some(result) = starts.join_next().await {
            match result.unwrap() {
                Ok(run) => accepted.push(run),
                Err(ControlError::AlreadyRunning) => refused += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(accepted.len(), 1);
        assert_eq!(refused, 7);

        accepted.pop().unwrap().completion.wait().await.unwrap();
        assert_eq!(executor.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_refused_while_running() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = paced(3, executor);

        let accepted = controller.start(0).await.unwrap();
        assert!(matches!(
            controller.reset().await,
            Err(ControlError::AlreadyRunning)
        ));

        accepted.completion.wait().await.unwrap();
        let state = controller.reset().await.unwrap();
        assert_eq!(state.current_index, 0);
        assert_eq!(state.total_processed, 0);
        assert_eq!(state.started_at, None);
    }

    fn stale_state(index: u64) -> PipelineState {
        let mut state = PipelineState::default();
        state.is_running = true;
        state.current_index = index;
        state.success_count = index;
        state.total_processed = index;
        state
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_clears_stale_flag() {
        let store = Arc::new(MemoryStateStore::with_state(stale_state(1)));
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = build(3, executor.clone(), store, Duration::from_secs(30));

        let outcome = controller.recover(false).await.unwrap();
        assert_eq!(outcome, RecoveryOutcome::Cleared { index: 1 });

        let state = controller.status().await.unwrap().state;
        assert!(!state.is_running);
        assert_eq!(state.current_index, 1);
        assert_eq!(executor.call_count(), 0);

        assert_eq!(
            controller.recover(false).await.unwrap(),
            RecoveryOutcome::Clean
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_auto_resumes() {
        let store = Arc::new(MemoryStateStore::with_state(stale_state(1)));
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = build(3, executor.clone(), store, Duration::from_secs(30));

        let outcome = controller.recover(true).await.unwrap();
        assert_eq!(outcome, RecoveryOutcome::Resumed { index: 1 });

        controller.completion().await.unwrap().wait().await.unwrap();
        assert_eq!(executor.executed(), vec![1, 2]);
        assert_eq!(controller.status().await.unwrap().state.total_processed, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recover_does_not_resume_finished_source() {
        let store = Arc::new(MemoryStateStore::with_state(stale_state(3)));
        let controller = build(
            3,
            Arc::new(ScriptedExecutor::succeeding()),
            store,
            Duration::from_secs(30),
        );

        let outcome = controller.recover(true).await.unwrap();
        assert_eq!(outcome, RecoveryOutcome::Cleared { index: 3 });
        assert!(!controller.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_waits_for_worker() {
        let executor = Arc::new(ScriptedExecutor::succeeding());
        let controller = paced(3, executor.clone());

        controller.start(0).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        controller.shutdown().await;

        assert!(!controller.is_active().await);
        let state = controller.status().await.unwrap().state;
        assert!(!state.is_running);
        assert_eq!(executor.call_count(), 1);
    }

    struct PanickingExecutor;

    #[async_trait]
    impl JobExecutor for PanickingExecutor {
        async fn execute(
            &self,
            _job: &Job,
            _ctx: &ExecutionContext,
        ) -> Result<JobResult, ExecutionError> {
            panic!("executor bug");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_panic_releases_slot() {
        let controller = build(
            3,
            Arc::new(PanickingExecutor),
            Arc::new(MemoryStateStore::new()),
            Duration::from_secs(30),
        );

        let summary = controller.start(0).await.unwrap().completion.wait().await.unwrap();
        assert_eq!(summary.end, RunEnd::Aborted);
        assert!(!summary.state.is_running);
        assert!(!controller.is_active().await);
        assert!(!controller.status().await.unwrap().state.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_clamps_limits() {
        let controller = paced(2, Arc::new(ScriptedExecutor::failing([0])));
        controller.start(0).await.unwrap().completion.wait().await;

        let page = controller
            .list_results(&ResultQuery {
                status: Some(Outcome::Failure),
                limit: Some(5000),
                offset: None,
            })
            .await
            .unwrap();
        assert_eq!(page.limit, MAX_PAGE_LIMIT);
        assert_eq!(page.total, 1);

        let default_page = controller.list_results(&ResultQuery::default()).await.unwrap();
        assert_eq!(default_page.limit, DEFAULT_RESULT_LIMIT);
        assert_eq!(default_page.total, 2);

        let stats = controller.result_stats().await.unwrap();
        assert_eq!(stats.failed, 1);

        let logs = controller.recent_logs(Some(1)).await.unwrap();
        assert_eq!(logs.len(), 1);
    }
}
