//! Data Transfer Objects for the control API
//!
//! Request and response shapes shared by the orchestrator's HTTP adapter and
//! the clients talking to it.

pub mod log;
pub mod pipeline;
pub mod result;

use serde::{Deserialize, Serialize};

/// Error body returned by every control endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human readable reason
    pub error: String,

    /// Machine readable error kind (e.g. "already_running")
    pub kind: String,
}
