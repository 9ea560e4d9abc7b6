//! Worker actor for executing jobs.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::FutureExt;
use pool_core::{Job, JobResult, RunEvent};
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::compute::{Compute, ComputeResult};
use crate::context::RunContext;
use crate::error::RunError;
use crate::messages::WorkerMessage;
use crate::queue::{JobRx, ResultTx};

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Shared job queue.
    jobs: JobRx,
    /// Result queue handle, released when the worker stops.
    results: ResultTx,
    compute: Arc<dyn Compute>,
    ctx: RunContext,
    max_retries: u32,
    job_timeout: Option<Duration>,
    /// Jobs this worker has finished.
    pub processed: u64,
}

impl WorkerActorState {
    /// Run one job to a result, retrying failed attempts.
    async fn process(&self, job: Job) -> JobResult {
        let started = Instant::now();
        self.ctx.emit(RunEvent::JobStarted {
            run_id: self.ctx.run_id,
            job_id: job.id,
            worker_id: self.worker_id.clone(),
            timestamp: Utc::now(),
        });

        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.attempt(job.input).await {
                Ok(output) => break JobResult::completed(job, output, &self.worker_id),
                Err(error) if attempts <= self.max_retries && !self.ctx.is_cancelled() => {
                    tracing::warn!(
                        "Job {} attempt {} failed on {}: {}",
                        job.id,
                        attempts,
                        self.worker_id,
                        error
                    );
                    self.ctx.emit(RunEvent::JobRetrying {
                        run_id: self.ctx.run_id,
                        job_id: job.id,
                        attempt: attempts + 1,
                        error,
                        timestamp: Utc::now(),
                    });
                }
                Err(error) => {
                    break JobResult::failed(job, error, attempts, &self.worker_id);
                }
            }
        };

        result.with_duration_ms(started.elapsed().as_millis() as u64)
    }

    /// A single compute attempt. Panics and timeouts become errors.
    async fn attempt(&self, input: i64) -> ComputeResult {
        let compute = Arc::clone(&self.compute);
        let attempt = AssertUnwindSafe(async move { compute.compute(input).await }).catch_unwind();

        let outcome = match self.job_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, attempt).await {
                Ok(outcome) => outcome,
                Err(_) => return Err("Job timed out".into()),
            },
            None => attempt.await,
        };

        outcome.unwrap_or_else(|panic| Err(format!("Job panicked: {}", panic_message(&*panic))))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub jobs: JobRx,
    pub results: ResultTx,
    pub compute: Arc<dyn Compute>,
    pub ctx: RunContext,
    pub max_retries: u32,
    pub job_timeout: Option<Duration>,
}

/// Worker actor that pulls jobs until the job queue is drained.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::debug!("Starting worker: {}", args.worker_id);

        args.ctx.emit(RunEvent::WorkerStarted {
            run_id: args.ctx.run_id,
            worker_id: args.worker_id.clone(),
            timestamp: Utc::now(),
        });

        // Kick off the pull loop
        myself.send_message(WorkerMessage::Pull)?;

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            jobs: args.jobs,
            results: args.results,
            compute: args.compute,
            ctx: args.ctx,
            max_retries: args.max_retries,
            job_timeout: args.job_timeout,
            processed: 0,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Pull => {
                let next = tokio::select! {
                    biased;
                    _ = state.ctx.cancelled() => None,
                    job = state.jobs.pop() => job,
                };

                let Some(job) = next else {
                    tracing::debug!(
                        "Worker {} done after {} jobs",
                        state.worker_id,
                        state.processed
                    );
                    myself.stop(None);
                    return Ok(());
                };

                let result = state.process(job).await;
                state
                    .results
                    .push(result)
                    .await
                    .map_err(|_| RunError::QueueClosed("result queue"))?;
                state.processed += 1;

                myself.send_message(WorkerMessage::Pull)?;
            }
        }

        Ok(())
    }
}
