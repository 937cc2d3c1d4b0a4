//! Conveyor Core
//!
//! Core types shared by the Conveyor pipeline services.
//!
//! This crate contains:
//! - Domain types: jobs, job results, the persisted pipeline state and log entries
//! - DTOs: request/response shapes of the control API, shared by server and clients

pub mod domain;
pub mod dto;
