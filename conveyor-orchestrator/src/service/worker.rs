//! Pipeline worker
//!
//! Drives one run over a contiguous range of the job source. The worker is
//! the only writer of the progress counters for the duration of its run;
//! cancellation is observed only between jobs.

use std::time::{Duration, Instant};

use conveyor_core::domain::job::{Job, JobResult};
use conveyor_core::domain::log::LogEntry;
use conveyor_core::domain::state::{PipelineState, StatePatch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::service::controller::{PipelineComponents, PipelineSettings};
use crate::service::executor::ExecutionContext;
use crate::service::notify::{NotifyQueue, PipelineEvent};

/// Time pending notifications get to drain once the run is over
const NOTIFY_DRAIN_GRACE: Duration = Duration::from_secs(5);

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// Every job up to the end of the source was processed
    Completed,
    /// A stop request was honored at a job boundary
    Cancelled,
    /// The run could not continue, or the worker task died unexpectedly
    Aborted,
}

/// Final report of one run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub end: RunEnd,
    pub state: PipelineState,
}

pub struct Worker {
    run_id: Uuid,
    start_index: u64,
    state: PipelineState,
    components: PipelineComponents,
    settings: PipelineSettings,
    cancel: CancellationToken,
}

impl Worker {
    /// Creates a worker that continues from `state` at `start_index`
    pub fn new(
        run_id: Uuid,
        start_index: u64,
        state: PipelineState,
        components: PipelineComponents,
        settings: PipelineSettings,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            run_id,
            start_index,
            state,
            components,
            settings,
            cancel,
        }
    }

    pub async fn run(mut self) -> RunSummary {
        let job_count = self.components.source.len();

        info!(
            "Run {} starting at job {} of {}",
            self.run_id, self.start_index, job_count
        );
        self.log(LogEntry::info(
            format!(
                "Pipeline started at index {} ({} jobs in source)",
                self.start_index, job_count
            ),
            None,
        ))
        .await;
        let events = NotifyQueue::spawn(self.components.notifier.clone());
        events.push(PipelineEvent::RunStarted {
            start_index: self.start_index,
            job_count,
        });

        let mut end = RunEnd::Completed;
        let mut abort_reason = None;

        for index in self.start_index..job_count {
            if self.cancel.is_cancelled() {
                end = RunEnd::Cancelled;
                break;
            }

            let Some(job) = self.components.source.get(index) else {
                error!("Job {} missing from source, aborting run", index);
                end = RunEnd::Aborted;
                abort_reason = Some(format!("job {} missing from source", index));
                break;
            };

            self.process(&job, job_count, &events).await;

            if index + 1 < job_count {
                debug!(
                    "Pausing {:?} before job {}",
                    self.settings.inter_job_delay,
                    index + 1
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        end = RunEnd::Cancelled;
                        break;
                    }
                    _ = tokio::time::sleep(self.settings.inter_job_delay) => {}
                }
            }
        }

        self.finish(end, abort_reason, events).await
    }

    /// Executes one job and commits its outcome
    async fn process(&mut self, job: &Job, job_count: u64, events: &NotifyQueue) {
        let index = job.index;

        events.push(PipelineEvent::JobStarted { index, job_count });
        self.log(LogEntry::info(
            format!(
                "Processing job {}/{}: {}",
                index + 1,
                job_count,
                job.credential
            ),
            Some(index),
        ))
        .await;

        let ctx = ExecutionContext::new(
            self.settings.static_credential.clone(),
            self.settings.job_deadline,
        );
        let started = Instant::now();

        let mut result = match self.components.executor.execute(job, &ctx).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Executor fault on job {}: {}", index, e);
                JobResult::failure(index, e.to_string(), started.elapsed())
            }
        };

        if result.job_index != index {
            warn!(
                "Executor reported job {} while running job {}, keeping {}",
                result.job_index, index, index
            );
            result.job_index = index;
        }

        self.state.record(index, result.outcome);

        if let Err(e) = self
            .components
            .store
            .merge(StatePatch::progress(&self.state))
            .await
        {
            error!("Failed to persist progress after job {}: {}", index, e);
        }

        if let Err(e) = self.components.results.append(&result).await {
            warn!("Failed to store result of job {}: {}", index, e);
        }

        let entry = if result.is_success() {
            LogEntry::info(
                format!(
                    "Job {} succeeded in {:.1}s",
                    index,
                    result.processing_time.as_secs_f64()
                ),
                Some(index),
            )
        } else {
            LogEntry::error(
                format!(
                    "Job {} failed: {}",
                    index,
                    result.error_detail.as_deref().unwrap_or("unknown error")
                ),
                Some(index),
            )
        };
        self.log(entry).await;

        info!(
            "Job {} finished with {} ({}/{} processed, {} ok, {} failed)",
            index,
            result.outcome,
            self.state.current_index,
            job_count,
            self.state.success_count,
            self.state.fail_count
        );

        events.push(PipelineEvent::JobFinished {
            result,
            state: self.state.clone(),
            job_count,
        });
    }

    async fn finish(
        mut self,
        end: RunEnd,
        abort_reason: Option<String>,
        events: NotifyQueue,
    ) -> RunSummary {
        match self
            .components
            .store
            .merge(StatePatch::finished(&self.state))
            .await
        {
            Ok(persisted) => self.state = persisted,
            Err(e) => {
                error!("Failed to persist end of run {}: {}", self.run_id, e);
                self.state.is_running = false;
            }
        }

        let (message, event) = match end {
            RunEnd::Cancelled => (
                format!("Pipeline stopped at index {}", self.state.current_index),
                PipelineEvent::RunStopped {
                    state: self.state.clone(),
                },
            ),
            RunEnd::Aborted => {
                let reason = abort_reason.unwrap_or_else(|| "unknown error".to_string());
                (
                    format!(
                        "Pipeline aborted at index {}: {}",
                        self.state.current_index, reason
                    ),
                    PipelineEvent::RunAborted {
                        state: self.state.clone(),
                        reason,
                    },
                )
            }
            RunEnd::Completed => (
                format!(
                    "Pipeline completed: {} processed, {} ok, {} failed",
                    self.state.total_processed, self.state.success_count, self.state.fail_count
                ),
                PipelineEvent::RunCompleted {
                    state: self.state.clone(),
                },
            ),
        };

        info!("Run {}: {}", self.run_id, message);
        let entry = match end {
            RunEnd::Aborted => LogEntry::error(message, None),
            _ => LogEntry::info(message, None),
        };
        self.log(entry).await;

        events.push(event);
        events.close(NOTIFY_DRAIN_GRACE).await;

        RunSummary {
            run_id: self.run_id,
            end,
            state: self.state,
        }
    }

    async fn log(&self, entry: LogEntry) {
        if let Err(e) = self.components.logs.append(entry).await {
            warn!("Failed to append pipeline log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use conveyor_core::domain::job::Outcome;

    use super::*;
    use crate::repository::{
        JobSource, LogStore, MemoryLogStore, MemoryResultStore, MemoryStateStore, ResultStore,
        StateStore, StaticJobSource,
    };
    use async_trait::async_trait;

    use crate::service::executor::testing::ScriptedExecutor;
    use crate::service::executor::{ExecutionError, JobExecutor};
    use crate::service::notify::testing::{HangingNotifier, RecordingNotifier};

    /// Executor that always reports job 0 as done
    struct MisindexingExecutor;

    #[async_trait]
    impl JobExecutor for MisindexingExecutor {
        async fn execute(
            &self,
            _job: &Job,
            _ctx: &ExecutionContext,
        ) -> Result<JobResult, ExecutionError> {
            Ok(JobResult::success(0, Duration::from_secs(1)))
        }
    }

    /// Source that claims more jobs than it can hand out
    struct ShortSource {
        inner: StaticJobSource,
        claimed: u64,
    }

    impl JobSource for ShortSource {
        fn len(&self) -> u64 {
            self.claimed
        }

        fn get(&self, index: u64) -> Option<Job> {
            self.inner.get(index)
        }
    }

    struct Harness {
        components: PipelineComponents,
        store: Arc<MemoryStateStore>,
        executor: Arc<ScriptedExecutor>,
        results: Arc<MemoryResultStore>,
        logs: Arc<MemoryLogStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(jobs: usize, executor: ScriptedExecutor) -> Harness {
        let source = StaticJobSource::new(
            (0..jobs)
                .map(|i| (format!("user{}@example.com", i), format!("pw{}", i)))
                .collect(),
        );
        let store = Arc::new(MemoryStateStore::new());
        let executor = Arc::new(executor);
        let results = Arc::new(MemoryResultStore::new());
        let logs = Arc::new(MemoryLogStore::new());
        let notifier = Arc::new(RecordingNotifier::default());

        let components = PipelineComponents {
            store: store.clone(),
            source: Arc::new(source),
            executor: executor.clone(),
            results: results.clone(),
            logs: logs.clone(),
            notifier: notifier.clone(),
        };

        Harness {
            components,
            store,
            executor,
            results,
            logs,
            notifier,
        }
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            inter_job_delay: Duration::from_secs(30),
            job_estimate: Duration::from_secs(300),
            job_deadline: None,
            static_credential: "static".to_string(),
        }
    }

    async fn start_worker(h: &Harness, start: u64, cancel: CancellationToken) -> Worker {
        let state = h
            .store
            .merge(StatePatch::started(start, Utc::now()))
            .await
            .unwrap();
        Worker::new(
            Uuid::new_v4(),
            start,
            state,
            h.components.clone(),
            settings(),
            cancel,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_with_one_failure() {
        let h = harness(3, ScriptedExecutor::failing([1]));
        let worker = start_worker(&h, 0, CancellationToken::new()).await;

        let summary = worker.run().await;

        assert_eq!(summary.end, RunEnd::Completed);
        assert_eq!(
            h.notifier.progress(),
            vec![(1, 0, 1, 1), (1, 1, 2, 2), (2, 1, 3, 3)]
        );

        let state = h.store.get().await.unwrap();
        assert!(!state.is_running);
        assert_eq!(state.current_index, 3);
        assert_eq!(state.total_processed, 3);
        assert_eq!(state.success_count, 2);
        assert_eq!(state.fail_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_executor_faults_count_as_failures() {
        let h = harness(4, ScriptedExecutor::faulting([0, 1, 2, 3]));
        let worker = start_worker(&h, 0, CancellationToken::new()).await;

        let summary = worker.run().await;

        assert_eq!(summary.end, RunEnd::Completed);
        assert_eq!(summary.state.fail_count, 4);
        assert_eq!(summary.state.success_count, 0);
        assert_eq!(summary.state.current_index, 4);

        let failures = h.results.list(Some(Outcome::Failure), 10, 0).await.unwrap();
        assert_eq!(failures.total, 4);
        assert!(
            failures.results[0]
                .error_detail
                .as_deref()
                .unwrap()
                .contains("executor crashed")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_mid_source() {
        let h = harness(5, ScriptedExecutor::succeeding());
        let worker = start_worker(&h, 3, CancellationToken::new()).await;

        let summary = worker.run().await;

        assert_eq!(h.executor.executed(), vec![3, 4]);
        assert_eq!(summary.state.current_index, 5);
        assert_eq!(summary.state.total_processed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_pause_stops_at_boundary() {
        let h = harness(3, ScriptedExecutor::succeeding());
        let cancel = CancellationToken::new();
        let worker = start_worker(&h, 0, cancel.clone()).await;

        let handle = tokio::spawn(worker.run());

        // First job completes immediately, then the worker sleeps 30s
        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();

        let summary = handle.await.unwrap();
        assert_eq!(summary.end, RunEnd::Cancelled);
        assert_eq!(summary.state.current_index, 1);
        assert_eq!(h.executor.call_count(), 1);
        assert!(!h.store.get().await.unwrap().is_running);
        assert!(matches!(
            h.notifier.events().last(),
            Some(PipelineEvent::RunStopped { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_first_job() {
        let h = harness(3, ScriptedExecutor::succeeding());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let worker = start_worker(&h, 0, cancel).await;

        let summary = worker.run().await;
        assert_eq!(summary.end, RunEnd::Cancelled);
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_logs_and_results() {
        let h = harness(2, ScriptedExecutor::succeeding());
        let worker = start_worker(&h, 0, CancellationToken::new()).await;
        worker.run().await;

        let page = h.results.list(None, 10, 0).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results[0].identity.as_deref(), Some("user1@example.com"));

        let logs = h.logs.recent(50).await.unwrap();
        assert!(logs[0].message.starts_with("Pipeline completed"));
        assert!(logs.iter().any(|l| l.related_job_index == Some(1)));
        assert_eq!(h.components.source.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_between_jobs_only() {
        let h = harness(3, ScriptedExecutor::succeeding());
        let worker = start_worker(&h, 0, CancellationToken::new()).await;

        let started = tokio::time::Instant::now();
        worker.run().await;

        // Two pauses for three jobs
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_follows_worker_index_not_executor_report() {
        let mut h = harness(3, ScriptedExecutor::succeeding());
        h.components.executor = Arc::new(MisindexingExecutor);
        let worker = start_worker(&h, 0, CancellationToken::new()).await;

        let summary = worker.run().await;

        assert_eq!(summary.end, RunEnd::Completed);
        assert_eq!(summary.state.current_index, 3);
        assert_eq!(summary.state.total_processed, 3);
        assert_eq!(h.notifier.progress(), vec![(1, 0, 1, 1), (2, 0, 2, 2), (3, 0, 3, 3)]);

        let page = h.results.list(None, 10, 0).await.unwrap();
        let mut indices: Vec<u64> = page.results.iter().map(|r| r.job_index).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(h.store.get().await.unwrap().current_index, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_job_aborts_run() {
        let mut h = harness(0, ScriptedExecutor::succeeding());
        h.components.source = Arc::new(ShortSource {
            inner: StaticJobSource::new(vec![("only@example.com".to_string(), "pw".to_string())]),
            claimed: 3,
        });
        let worker = start_worker(&h, 0, CancellationToken::new()).await;

        let summary = worker.run().await;

        assert_eq!(summary.end, RunEnd::Aborted);
        assert_eq!(summary.state.current_index, 1);
        assert!(!summary.state.is_running);
        assert!(matches!(
            h.notifier.events().last(),
            Some(PipelineEvent::RunAborted { reason, .. }) if reason.contains("job 1")
        ));

        let logs = h.logs.recent(1).await.unwrap();
        assert!(logs[0].message.starts_with("Pipeline aborted at index 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_notifier_does_not_hold_up_stop() {
        let mut h = harness(3, ScriptedExecutor::succeeding());
        h.components.notifier = Arc::new(HangingNotifier);
        let cancel = CancellationToken::new();
        let worker = start_worker(&h, 0, cancel.clone()).await;

        let handle = tokio::spawn(worker.run());

        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();

        let summary = tokio::time::timeout(Duration::from_secs(60), handle)
            .await
            .expect("worker should end despite a stuck notifier")
            .unwrap();
        assert_eq!(summary.end, RunEnd::Cancelled);
        assert_eq!(summary.state.current_index, 1);
        assert!(!h.store.get().await.unwrap().is_running);
    }
}
