//! Error type for pool runs.

use pool_core::{ConfigError, JobId};

/// Result type for pool operations.
pub type RunResult<T> = Result<T, RunError>;

/// Error type for pool runs.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Invalid config: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to spawn actor: {0}")]
    Spawn(#[from] ractor::SpawnErr),

    /// A push hit a queue whose readers were gone. Indicates a close-ordering bug.
    #[error("{0} closed while still in use")]
    QueueClosed(&'static str),

    #[error("Collected {collected} results for {expected} jobs")]
    Incomplete { expected: u64, collected: u64 },

    #[error("Job {job_id} failed: {error}")]
    JobFailed { job_id: JobId, error: String },

    #[error("Run cancelled after collecting {collected} results")]
    Cancelled { collected: u64 },

    #[error("Task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
