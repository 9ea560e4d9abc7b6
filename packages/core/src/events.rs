//! Event types for observing a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Job, JobId, RunId, RunState, RunStats};

/// Events emitted while a run executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    // Run events
    /// The run moved to a new lifecycle state.
    RunStateChanged {
        run_id: RunId,
        old_state: RunState,
        new_state: RunState,
        timestamp: DateTime<Utc>,
    },
    /// All results were collected.
    RunFinished {
        run_id: RunId,
        stats: RunStats,
        timestamp: DateTime<Utc>,
    },

    // Queue events
    /// The producer put a job on the job queue.
    JobEnqueued {
        run_id: RunId,
        job: Job,
        timestamp: DateTime<Utc>,
    },
    /// The producer closed the job queue.
    JobQueueClosed {
        run_id: RunId,
        enqueued: u64,
        timestamp: DateTime<Utc>,
    },
    /// The coordinator closed the result queue.
    ResultQueueClosed {
        run_id: RunId,
        timestamp: DateTime<Utc>,
    },

    // Job events
    /// A worker took a job off the queue.
    JobStarted {
        run_id: RunId,
        job_id: JobId,
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A failed attempt is being retried.
    JobRetrying {
        run_id: RunId,
        job_id: JobId,
        attempt: u32,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// The collector received a completed result.
    JobCompleted {
        run_id: RunId,
        job_id: JobId,
        output: i64,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    /// The collector received a failed result.
    JobFailed {
        run_id: RunId,
        job_id: JobId,
        error: String,
        attempts: u32,
        timestamp: DateTime<Utc>,
    },

    // Worker events
    /// A worker joined the pool.
    WorkerStarted {
        run_id: RunId,
        worker_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A worker left the pool. `error` is set when it crashed.
    WorkerExited {
        run_id: RunId,
        worker_id: String,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl RunEvent {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            RunEvent::RunStateChanged { timestamp, .. } => *timestamp,
            RunEvent::RunFinished { timestamp, .. } => *timestamp,
            RunEvent::JobEnqueued { timestamp, .. } => *timestamp,
            RunEvent::JobQueueClosed { timestamp, .. } => *timestamp,
            RunEvent::ResultQueueClosed { timestamp, .. } => *timestamp,
            RunEvent::JobStarted { timestamp, .. } => *timestamp,
            RunEvent::JobRetrying { timestamp, .. } => *timestamp,
            RunEvent::JobCompleted { timestamp, .. } => *timestamp,
            RunEvent::JobFailed { timestamp, .. } => *timestamp,
            RunEvent::WorkerStarted { timestamp, .. } => *timestamp,
            RunEvent::WorkerExited { timestamp, .. } => *timestamp,
        }
    }

    /// Get the run this event belongs to.
    pub fn run_id(&self) -> RunId {
        match self {
            RunEvent::RunStateChanged { run_id, .. } => *run_id,
            RunEvent::RunFinished { run_id, .. } => *run_id,
            RunEvent::JobEnqueued { run_id, .. } => *run_id,
            RunEvent::JobQueueClosed { run_id, .. } => *run_id,
            RunEvent::ResultQueueClosed { run_id, .. } => *run_id,
            RunEvent::JobStarted { run_id, .. } => *run_id,
            RunEvent::JobRetrying { run_id, .. } => *run_id,
            RunEvent::JobCompleted { run_id, .. } => *run_id,
            RunEvent::JobFailed { run_id, .. } => *run_id,
            RunEvent::WorkerStarted { run_id, .. } => *run_id,
            RunEvent::WorkerExited { run_id, .. } => *run_id,
        }
    }

    /// Get the job ID associated with this event, if any.
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            RunEvent::JobEnqueued { job, .. } => Some(job.id),
            RunEvent::JobStarted { job_id, .. } => Some(*job_id),
            RunEvent::JobRetrying { job_id, .. } => Some(*job_id),
            RunEvent::JobCompleted { job_id, .. } => Some(*job_id),
            RunEvent::JobFailed { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            RunEvent::RunStateChanged {
                run_id, new_state, ..
            } => format!("Run {} -> {}", run_id, new_state),
            RunEvent::RunFinished { run_id, stats, .. } => format!(
                "Run {} finished: {} completed, {} failed",
                run_id, stats.completed, stats.failed
            ),
            RunEvent::JobEnqueued { job, .. } => format!("Job {} enqueued", job.id),
            RunEvent::JobQueueClosed { enqueued, .. } => {
                format!("Job queue closed after {} jobs", enqueued)
            }
            RunEvent::ResultQueueClosed { .. } => "Result queue closed".to_string(),
            RunEvent::JobStarted {
                job_id, worker_id, ..
            } => format!("Job {} started by {}", job_id, worker_id),
            RunEvent::JobRetrying {
                job_id, attempt, ..
            } => format!("Job {} retrying (attempt {})", job_id, attempt),
            RunEvent::JobCompleted {
                job_id,
                duration_ms,
                ..
            } => format!("Job {} completed in {}ms", job_id, duration_ms),
            RunEvent::JobFailed { job_id, error, .. } => {
                format!("Job {} failed: {}", job_id, error)
            }
            RunEvent::WorkerStarted { worker_id, .. } => format!("Worker {} started", worker_id),
            RunEvent::WorkerExited {
                worker_id, error, ..
            } => match error {
                Some(err) => format!("Worker {} crashed: {}", worker_id, err),
                None => format!("Worker {} exited", worker_id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_and_tagging() {
        let run_id = RunId::new();
        let event = RunEvent::JobEnqueued {
            run_id,
            job: Job::new(4, 99),
            timestamp: Utc::now(),
        };
        assert_eq!(event.run_id(), run_id);
        assert_eq!(event.job_id(), Some(JobId(4)));
        assert_eq!(event.description(), "Job 4 enqueued");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "job_enqueued");

        let exited = RunEvent::WorkerExited {
            run_id,
            worker_id: "worker-2".into(),
            error: Some("panicked".into()),
            timestamp: Utc::now(),
        };
        assert_eq!(exited.job_id(), None);
        assert_eq!(exited.description(), "Worker worker-2 crashed: panicked");
    }
}
