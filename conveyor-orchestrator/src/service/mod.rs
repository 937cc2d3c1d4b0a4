//! Service Module
//!
//! Pipeline core: the controller, the worker it spawns, and the executor and
//! notifier capabilities the worker drives.

pub mod controller;
pub mod executor;
pub mod notify;
pub mod worker;

// Re-export for convenience
pub use controller::{
    ControlError, PipelineComponents, PipelineController, PipelineSettings, RecoveryOutcome,
};
pub use executor::{ExecutionContext, ExecutionError, JobExecutor, WebhookExecutor};
pub use notify::{Notifier, NullNotifier, PipelineEvent};
pub use worker::{RunEnd, RunSummary};
