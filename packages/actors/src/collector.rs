//! Collector that drains the result queue.

use std::sync::Arc;

use chrono::Utc;
use pool_core::{FailurePolicy, JobId, JobOutcome, JobResult, RunEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::context::RunContext;
use crate::queue::ResultRx;

/// Callback invoked for each result as it arrives.
pub type ResultCallback = Arc<dyn Fn(&JobResult) + Send + Sync>;

/// What the collector gathered.
#[derive(Debug, Default)]
pub struct Collected {
    /// Results in arrival order.
    pub results: Vec<JobResult>,
    /// First failed job, recorded under [`FailurePolicy::Abort`].
    pub first_failure: Option<(JobId, String)>,
}

/// Drains the result queue until it is closed and empty.
pub struct Collector {
    results: ResultRx,
    ctx: RunContext,
    policy: FailurePolicy,
    on_result: Option<ResultCallback>,
}

impl Collector {
    pub fn new(results: ResultRx, ctx: RunContext, policy: FailurePolicy) -> Self {
        Self {
            results,
            ctx,
            policy,
            on_result: None,
        }
    }

    /// Forward each result to `callback` as it arrives.
    pub fn with_callback(mut self, callback: Option<ResultCallback>) -> Self {
        self.on_result = callback;
        self
    }

    /// Start draining on a new task. `done` fires with the number of
    /// collected results once the queue is closed and empty.
    pub fn spawn(self, done: oneshot::Sender<u64>) -> JoinHandle<Collected> {
        tokio::spawn(self.run(done))
    }

    pub async fn run(self, done: oneshot::Sender<u64>) -> Collected {
        let mut collected = Collected::default();

        while let Some(result) = self.results.pop().await {
            match &result.outcome {
                JobOutcome::Completed { output } => {
                    tracing::debug!(
                        "Job {} (input {}) -> {} on {}",
                        result.job.id,
                        result.job.input,
                        output,
                        result.worker_id
                    );
                    self.ctx.emit(RunEvent::JobCompleted {
                        run_id: self.ctx.run_id,
                        job_id: result.job.id,
                        output: *output,
                        duration_ms: result.duration_ms,
                        timestamp: Utc::now(),
                    });
                }
                JobOutcome::Failed { error, attempts } => {
                    tracing::warn!(
                        "Job {} failed after {} attempts: {}",
                        result.job.id,
                        attempts,
                        error
                    );
                    self.ctx.emit(RunEvent::JobFailed {
                        run_id: self.ctx.run_id,
                        job_id: result.job.id,
                        error: error.clone(),
                        attempts: *attempts,
                        timestamp: Utc::now(),
                    });

                    if self.policy == FailurePolicy::Abort && collected.first_failure.is_none() {
                        tracing::warn!("Aborting run {} on failed job", self.ctx.run_id);
                        collected.first_failure = Some((result.job.id, error.clone()));
                        self.ctx.cancel();
                    }
                }
            }

            if let Some(ref callback) = self.on_result {
                callback(&result);
            }
            collected.results.push(result);
        }

        tracing::debug!(
            "Collector drained {} results for run {}",
            collected.results.len(),
            self.ctx.run_id
        );
        let _ = done.send(collected.results.len() as u64);

        collected
    }
}
