//! Core domain types for the fan-out/fan-in job runner.
//!
//! This crate contains the runtime-agnostic types shared by the actor
//! system and the binary:
//! - Job, JobId and JobResult for units of work
//! - RunConfig and FailurePolicy for run behavior
//! - RunState, RunStats and RunSummary for a single run
//! - Events for observing a run while it executes

mod config;
mod events;
mod job;
mod run;

pub use config::{ConfigError, FailurePolicy, RunConfig};
pub use events::RunEvent;
pub use job::{Job, JobId, JobOutcome, JobResult};
pub use run::{RunId, RunState, RunStats, RunSummary};
