//! Message types for actor communication.

use ractor::RpcReplyPort;

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Pull the next job off the job queue and process it.
    Pull,
}

/// Messages for the PoolCoordinator.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// Get the pool's worker counts.
    GetStatus { reply: RpcReplyPort<PoolStatus> },
}

/// Snapshot of the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Workers started by the coordinator.
    pub started: usize,
    /// Workers that have not exited yet.
    pub live: usize,
    /// Workers that exited with an error.
    pub crashed: usize,
    /// Whether the result queue has been closed.
    pub results_closed: bool,
}
