//! Job runner: wires producer, worker pool and collector into one run.

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pool_core::{
    FailurePolicy, JobId, JobResult, RunConfig, RunEvent, RunId, RunState, RunStats, RunSummary,
};
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;

use crate::collector::{Collector, ResultCallback};
use crate::compute::Compute;
use crate::context::RunContext;
use crate::coordinator::{CoordinatorArgs, start_coordinator};
use crate::error::{RunError, RunResult};
use crate::producer::{produce, random_inputs};
use crate::queue;

/// Range of the inputs generated by [`run_jobs`].
pub const RANDOM_INPUT_RANGE: Range<i64> = 0..999;

/// Tracks the lifecycle state of one run and reports transitions.
struct RunTracker {
    ctx: RunContext,
    state: RunState,
}

impl RunTracker {
    fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                "Ignoring run {} transition {} -> {}",
                self.ctx.run_id,
                self.state,
                next
            );
            return;
        }

        tracing::debug!("Run {} -> {}", self.ctx.run_id, next);
        self.ctx.emit(RunEvent::RunStateChanged {
            run_id: self.ctx.run_id,
            old_state: self.state,
            new_state: next,
            timestamp: Utc::now(),
        });
        self.state = next;
    }
}

/// Runs a fixed set of jobs across a bounded worker pool.
///
/// Every call to [`JobRunner::run`] builds fresh queues and a fresh pool, so
/// one runner can execute several runs in sequence.
pub struct JobRunner {
    config: RunConfig,
    compute: Arc<dyn Compute>,
    event_tx: broadcast::Sender<RunEvent>,
    cancel: CancellationToken,
    on_result: Option<ResultCallback>,
}

impl JobRunner {
    /// Create a runner with the given config and compute function.
    pub fn new(config: RunConfig, compute: impl Compute) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self {
            config,
            compute: Arc::new(compute),
            event_tx,
            cancel: CancellationToken::new(),
            on_result: None,
        }
    }

    /// Stop runs when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Call `callback` for every result as the collector receives it.
    pub fn on_result(mut self, callback: impl Fn(&JobResult) + Send + Sync + 'static) -> Self {
        self.on_result = Some(Arc::new(callback));
        self
    }

    /// Subscribe to events from subsequent runs.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.event_tx.subscribe()
    }

    /// Run one job per input and wait for every result.
    pub async fn run<I>(&self, inputs: I) -> RunResult<RunSummary>
    where
        I: IntoIterator<Item = i64>,
        I::IntoIter: Send + 'static,
    {
        self.config.validate()?;

        let run_id = RunId::new();
        let cancel = self.cancel.child_token();
        let ctx = RunContext::new(run_id, self.event_tx.clone(), cancel);
        let mut tracker = RunTracker::new(ctx.clone());
        let started_at = Utc::now();

        tracing::info!(
            "Starting run {} with {} workers (queues {}/{})",
            run_id,
            self.config.worker_count,
            self.config.job_queue_capacity,
            self.config.result_queue_capacity
        );

        let (job_tx, job_rx) = queue::bounded(self.config.job_queue_capacity);
        let (result_tx, result_rx) = queue::bounded(self.config.result_queue_capacity);

        // The collector must be draining before workers can fill the result queue.
        let (done_tx, done_rx) = oneshot::channel();
        let collector = Collector::new(result_rx, ctx.clone(), self.config.failure_policy)
            .with_callback(self.on_result.clone())
            .spawn(done_tx);

        let coordinator = start_coordinator(CoordinatorArgs {
            worker_count: self.config.worker_count,
            jobs: job_rx,
            results: result_tx,
            compute: Arc::clone(&self.compute),
            ctx: ctx.clone(),
            max_retries: self.config.max_retries,
            job_timeout: self.config.job_timeout_ms.map(Duration::from_millis),
        })
        .await;
        let coordinator_handle = match coordinator {
            Ok((_, handle)) => handle,
            Err(e) => {
                tracing::error!("Run {} failed to start its worker pool: {}", run_id, e);
                // Cancelling releases any workers that did start, which drops
                // the last result senders and lets the collector finish.
                ctx.cancel();
                let _ = collector.await;
                tracker.advance(RunState::Cancelled);
                return Err(e.into());
            }
        };

        tracker.advance(RunState::Running);
        let producer = tokio::spawn(produce(inputs.into_iter(), job_tx, ctx.clone()));

        let produced = producer.await;
        tracker.advance(RunState::Draining);

        let done = done_rx.await.ok();
        let collected = collector.await?;
        coordinator_handle.await?;

        let enqueued = produced??;
        let results = collected.results;
        let collected_count = results.len() as u64;
        if done != Some(collected_count) {
            tracing::error!(
                "Run {} collector signalled {:?} but returned {} results",
                run_id,
                done,
                collected_count
            );
            tracker.advance(RunState::Cancelled);
            return Err(RunError::Incomplete {
                expected: enqueued,
                collected: collected_count,
            });
        }

        if let Some((job_id, error)) = collected.first_failure {
            tracker.advance(RunState::Cancelled);
            return Err(RunError::JobFailed { job_id, error });
        }
        if ctx.is_cancelled() {
            tracker.advance(RunState::Cancelled);
            tracing::info!("Run {} cancelled after {} results", run_id, collected_count);
            return Err(RunError::Cancelled {
                collected: collected_count,
            });
        }
        if collected_count != enqueued {
            tracker.advance(RunState::Cancelled);
            tracing::error!(
                "Run {} collected {} results for {} jobs",
                run_id,
                collected_count,
                enqueued
            );
            return Err(RunError::Incomplete {
                expected: enqueued,
                collected: collected_count,
            });
        }

        let stats = RunStats::from_results(enqueued, self.config.worker_count, &results);
        tracker.advance(RunState::Done);
        ctx.emit(RunEvent::RunFinished {
            run_id,
            stats: stats.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(
            "Run {} finished: {} completed, {} failed",
            run_id,
            stats.completed,
            stats.failed
        );

        Ok(RunSummary {
            run_id,
            state: tracker.state,
            stats,
            results,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// Run `job_count` jobs with random inputs in `[0, 999)` on `worker_count`
/// workers and return `(job id, output)` for each, in collection order.
///
/// Any failed job aborts the run with [`RunError::JobFailed`].
pub async fn run_jobs(
    job_count: u64,
    worker_count: usize,
    compute: impl Compute,
) -> RunResult<Vec<(JobId, i64)>> {
    let config = RunConfig::with_workers(worker_count).with_failure_policy(FailurePolicy::Abort);
    let inputs = random_inputs(job_count, RANDOM_INPUT_RANGE)?;
    let summary = JobRunner::new(config, compute).run(inputs).await?;
    Ok(summary.outputs())
}
