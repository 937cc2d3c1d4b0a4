//! Core domain types
//!
//! These types describe the pipeline's units of work, their outcomes and the
//! single persisted progress record. They are shared between the orchestrator
//! (which persists and mutates them) and the control clients (which display them).

pub mod job;
pub mod log;
pub mod state;
