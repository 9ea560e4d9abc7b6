//! Pool coordinator: owns the workers and closes the result queue.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pool_core::RunEvent;
use ractor::{Actor, ActorId, ActorProcessingErr, ActorRef, SupervisionEvent};

use crate::compute::Compute;
use crate::context::RunContext;
use crate::messages::{CoordinatorMessage, PoolStatus, WorkerMessage};
use crate::queue::{JobRx, ResultTx};
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// State for the coordinator actor.
pub struct CoordinatorState {
    ctx: RunContext,
    /// Live workers by actor ID.
    workers: HashMap<ActorId, (String, ActorRef<WorkerMessage>)>,
    /// The coordinator's own result queue handle. Dropping it is what
    /// closes the queue once every worker has released theirs.
    results: Option<ResultTx>,
    started: usize,
    crashed: usize,
}

impl CoordinatorState {
    fn status(&self) -> PoolStatus {
        PoolStatus {
            started: self.started,
            live: self.workers.len(),
            crashed: self.crashed,
            results_closed: self.results.is_none(),
        }
    }

    /// Record a worker exit. Returns true when it was the last one.
    fn worker_exited(&mut self, id: ActorId, error: Option<String>) -> bool {
        let Some((worker_id, _)) = self.workers.remove(&id) else {
            return false;
        };

        if error.is_some() {
            self.crashed += 1;
        }
        self.ctx.emit(RunEvent::WorkerExited {
            run_id: self.ctx.run_id,
            worker_id,
            error,
            timestamp: Utc::now(),
        });

        self.workers.is_empty()
    }

    /// Close the result queue. Only the first call has any effect.
    fn close_results(&mut self) {
        if let Some(results) = self.results.take() {
            results.close();
            tracing::debug!("Result queue closed for run {}", self.ctx.run_id);
            self.ctx.emit(RunEvent::ResultQueueClosed {
                run_id: self.ctx.run_id,
                timestamp: Utc::now(),
            });
        }
    }
}

/// Coordinator actor arguments.
pub struct CoordinatorArgs {
    pub worker_count: usize,
    pub jobs: JobRx,
    pub results: ResultTx,
    pub compute: Arc<dyn Compute>,
    pub ctx: RunContext,
    pub max_retries: u32,
    pub job_timeout: Option<Duration>,
}

/// Coordinator actor that supervises the worker pool.
pub struct PoolCoordinator;

impl Actor for PoolCoordinator {
    type Msg = CoordinatorMessage;
    type State = CoordinatorState;
    type Arguments = CoordinatorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(
            "Starting pool coordinator for run {} with {} workers ({})",
            args.ctx.run_id,
            args.worker_count,
            args.compute.name()
        );

        args.compute.prepare().map_err(|e| {
            ActorProcessingErr::from(format!(
                "{} failed to prepare: {}",
                args.compute.name(),
                e
            ))
        })?;

        let mut workers = HashMap::with_capacity(args.worker_count);
        for n in 1..=args.worker_count {
            let worker_id = format!("worker-{}", n);
            let worker_args = WorkerArgs {
                worker_id: worker_id.clone(),
                jobs: args.jobs.clone(),
                results: args.results.clone(),
                compute: Arc::clone(&args.compute),
                ctx: args.ctx.clone(),
                max_retries: args.max_retries,
                job_timeout: args.job_timeout,
            };

            match Actor::spawn_linked(None, WorkerActor, worker_args, myself.get_cell()).await {
                Ok((worker, _handle)) => {
                    workers.insert(worker.get_id(), (worker_id, worker));
                }
                Err(e) => {
                    for (_, worker) in workers.values() {
                        worker.stop(Some("pool startup failed".to_string()));
                    }
                    return Err(ActorProcessingErr::from(format!(
                        "Failed to spawn {}: {}",
                        worker_id, e
                    )));
                }
            }
        }

        Ok(CoordinatorState {
            ctx: args.ctx,
            workers,
            results: Some(args.results),
            started: args.worker_count,
            crashed: 0,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CoordinatorMessage::GetStatus { reply } => {
                let _ = reply.send(state.status());
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        let last = match message {
            SupervisionEvent::ActorTerminated(cell, _, _reason) => {
                state.worker_exited(cell.get_id(), None)
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                tracing::warn!(
                    "Worker {} crashed in run {}: {}",
                    cell.get_id(),
                    state.ctx.run_id,
                    err
                );
                state.worker_exited(cell.get_id(), Some(err.to_string()))
            }
            _ => false,
        };

        if last {
            state.close_results();
            tracing::info!(
                "All {} workers exited for run {} ({} crashed)",
                state.started,
                state.ctx.run_id,
                state.crashed
            );
            myself.stop(None);
        }

        Ok(())
    }
}

/// Spawn a coordinator and its workers.
pub async fn start_coordinator(
    args: CoordinatorArgs,
) -> Result<(ActorRef<CoordinatorMessage>, tokio::task::JoinHandle<()>), ractor::SpawnErr> {
    Actor::spawn(None, PoolCoordinator, args).await
}
