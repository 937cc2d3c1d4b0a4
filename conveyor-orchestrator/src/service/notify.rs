//! Notification sink
//!
//! Pipeline progress events pushed to operators. Delivery is best effort:
//! a notifier logs its own failures and never reports them back to the worker.
//! The worker only enqueues events; a dispatcher task owns the transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conveyor_core::domain::job::JobResult;
use conveyor_core::domain::state::PipelineState;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::warn;

/// Events buffered between the worker and a slow notifier
const NOTIFY_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    RunStarted {
        start_index: u64,
        job_count: u64,
    },
    JobStarted {
        index: u64,
        job_count: u64,
    },
    JobFinished {
        result: JobResult,
        state: PipelineState,
        job_count: u64,
    },
    /// The worker processed the last job
    RunCompleted { state: PipelineState },
    /// The worker left the loop because of a stop request
    RunStopped { state: PipelineState },
    /// The run ended before the last job for a reason other than a stop
    RunAborted {
        state: PipelineState,
        reason: String,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PipelineEvent);
}

/// Notifier that drops every event
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _event: &PipelineEvent) {}
}

/// Queue feeding one notifier from a dedicated dispatcher task
pub struct NotifyQueue {
    tx: mpsc::Sender<PipelineEvent>,
    dispatcher: JoinHandle<()>,
}

impl NotifyQueue {
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, mut rx) = mpsc::channel::<PipelineEvent>(NOTIFY_QUEUE_CAPACITY);

        let dispatcher = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                notifier.notify(&event).await;
            }
        });

        Self { tx, dispatcher }
    }

    /// Enqueues an event without waiting; drops it when the queue is full
    pub fn push(&self, event: PipelineEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("Notification queue full, dropping event"),
            Err(TrySendError::Closed(_)) => warn!("Notification dispatcher is gone, dropping event"),
        }
    }

    /// Closes the queue and gives pending events up to `grace` to be delivered
    pub async fn close(self, grace: Duration) {
        let Self { tx, mut dispatcher } = self;
        drop(tx);

        if tokio::time::timeout(grace, &mut dispatcher).await.is_err() {
            warn!(
                "Notifier did not drain within {:?}, discarding pending events",
                grace
            );
            dispatcher.abort();
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{HangingNotifier, RecordingNotifier};
    use super::*;

    #[tokio::test]
    async fn test_queue_delivers_in_order_before_close_returns() {
        let notifier = Arc::new(RecordingNotifier::default());
        let queue = NotifyQueue::spawn(notifier.clone());

        queue.push(PipelineEvent::RunStarted {
            start_index: 0,
            job_count: 2,
        });
        queue.push(PipelineEvent::JobStarted {
            index: 0,
            job_count: 2,
        });
        queue.close(Duration::from_secs(5)).await;

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PipelineEvent::RunStarted { .. }));
        assert!(matches!(events[1], PipelineEvent::JobStarted { index: 0, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_notifier_does_not_block_push_or_close() {
        let queue = NotifyQueue::spawn(Arc::new(HangingNotifier));

        for index in 0..(NOTIFY_QUEUE_CAPACITY as u64 + 10) {
            queue.push(PipelineEvent::JobStarted {
                index,
                job_count: 1,
            });
        }

        let started = tokio::time::Instant::now();
        queue.close(Duration::from_secs(5)).await;
        assert!(started.elapsed() <= Duration::from_secs(6));
    }
}
