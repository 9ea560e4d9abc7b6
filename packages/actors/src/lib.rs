//! Actor system for the fan-out/fan-in job runner.
//!
//! This crate runs a fixed set of jobs across a bounded worker pool built on
//! Ractor actors and bounded tokio queues.
//!
//! # Architecture
//!
//! - `produce` - Fills the bounded job queue, then closes it
//! - `PoolCoordinator` - Spawns and supervises workers, closes the result
//!   queue once the last one exits
//! - `WorkerActor` - Pulls jobs until the job queue is drained
//! - `Collector` - Drains the result queue and signals completion
//! - `JobRunner` - Wires the stages together for one run
//!
//! # Usage
//!
//! ```ignore
//! use actors::{DigitSum, JobRunner, run_jobs};
//! use pool_core::RunConfig;
//!
//! // One-shot: 100 random inputs across 20 workers
//! let outputs = run_jobs(100, 20, DigitSum::new()).await?;
//!
//! // Configured runner with an event stream
//! let runner = JobRunner::new(RunConfig::with_workers(4), DigitSum::new());
//! let mut events = runner.subscribe();
//! let summary = runner.run(vec![12, 345, 678]).await?;
//! ```

mod collector;
mod compute;
mod context;
mod coordinator;
mod error;
mod messages;
mod producer;
pub mod queue;
mod runner;
mod worker_actor;

pub use collector::{Collected, Collector, ResultCallback};
pub use compute::{
    Compute, ComputeFuture, ComputeResult, DigitSum, FnCompute, SyncCompute, digit_sum,
};
pub use context::RunContext;
pub use coordinator::{CoordinatorArgs, PoolCoordinator, start_coordinator};
pub use error::{RunError, RunResult};
pub use messages::{CoordinatorMessage, PoolStatus, WorkerMessage};
pub use producer::{produce, random_inputs};
pub use runner::{JobRunner, RANDOM_INPUT_RANGE, run_jobs};
pub use worker_actor::{WorkerActor, WorkerArgs};

/// Re-export cancellation token for callers wiring external cancellation.
pub use tokio_util::sync::CancellationToken;

/// Re-export ractor types for convenience.
pub use ractor::{Actor, ActorRef, RpcReplyPort};
