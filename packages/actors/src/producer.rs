//! Producer that fills the job queue.

use std::ops::Range;

use chrono::Utc;
use pool_core::{ConfigError, Job, RunEvent};
use rand::Rng;

use crate::context::RunContext;
use crate::error::{RunError, RunResult};
use crate::queue::JobTx;

/// Enqueue one job per input, ids assigned in order from zero, then close
/// the job queue.
///
/// Suspends while the queue is full. Stops early if the run is cancelled;
/// the queue is closed either way. Returns the number of jobs enqueued.
pub async fn produce<I>(inputs: I, jobs: JobTx, ctx: RunContext) -> RunResult<u64>
where
    I: IntoIterator<Item = i64>,
{
    let mut enqueued = 0u64;

    for input in inputs {
        let job = Job::new(enqueued, input);
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                tracing::info!("Producer cancelled after {} jobs", enqueued);
                break;
            }
            pushed = jobs.push(job) => {
                pushed.map_err(|_| RunError::QueueClosed("job queue"))?;
            }
        }

        enqueued += 1;
        ctx.emit(RunEvent::JobEnqueued {
            run_id: ctx.run_id,
            job,
            timestamp: Utc::now(),
        });
    }

    jobs.close();
    tracing::debug!("Job queue closed after {} jobs", enqueued);
    ctx.emit(RunEvent::JobQueueClosed {
        run_id: ctx.run_id,
        enqueued,
        timestamp: Utc::now(),
    });

    Ok(enqueued)
}

/// `count` random inputs drawn uniformly from `range`.
pub fn random_inputs(count: u64, range: Range<i64>) -> RunResult<Vec<i64>> {
    if range.is_empty() {
        return Err(ConfigError::EmptyInputRange {
            start: range.start,
            end: range.end,
        }
        .into());
    }

    let mut rng = rand::rng();
    Ok((0..count)
        .map(|_| rng.random_range(range.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use pool_core::RunId;
    use tokio::sync::broadcast;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::queue;

    fn context(cancel: CancellationToken) -> RunContext {
        let (event_tx, _) = broadcast::channel(16);
        RunContext::new(RunId::new(), event_tx, cancel)
    }

    #[tokio::test]
    async fn enqueues_in_order_then_closes() {
        let (tx, rx) = queue::bounded(8);
        let enqueued = produce(vec![10, 20, 30], tx, context(CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(enqueued, 3);

        let mut jobs = Vec::new();
        while let Some(job) = rx.pop().await {
            jobs.push(job);
        }
        assert_eq!(jobs, vec![Job::new(0, 10), Job::new(1, 20), Job::new(2, 30)]);
    }

    #[tokio::test]
    async fn zero_jobs_closes_immediately() {
        let (tx, rx) = queue::bounded(1);
        let enqueued = produce(Vec::<i64>::new(), tx, context(CancellationToken::new()))
            .await
            .unwrap();
        assert_eq!(enqueued, 0);
        assert_eq!(rx.pop().await, None);
    }

    #[tokio::test]
    async fn cancellation_unblocks_a_full_queue() {
        let cancel = CancellationToken::new();
        let (tx, rx) = queue::bounded(2);
        let producer = tokio::spawn(produce(0..100, tx, context(cancel.clone())));

        // Let the producer fill the queue, then cancel while it waits.
        tokio::task::yield_now().await;
        cancel.cancel();
        let enqueued = producer.await.unwrap().unwrap();
        assert!(enqueued <= 2);

        let mut drained = 0;
        while rx.pop().await.is_some() {
            drained += 1;
        }
        assert_eq!(drained, enqueued);
    }

    #[test]
    fn random_inputs_stay_in_range() {
        let inputs = random_inputs(500, 0..999).unwrap();
        assert_eq!(inputs.len(), 500);
        assert!(inputs.iter().all(|n| (0..999).contains(n)));

        let negative = random_inputs(50, -10..-5).unwrap();
        assert!(negative.iter().all(|n| (-10..-5).contains(n)));
    }

    #[test]
    fn random_inputs_reject_empty_range() {
        assert!(matches!(
            random_inputs(3, 0..0),
            Err(RunError::Config(ConfigError::EmptyInputRange { start: 0, end: 0 }))
        ));
        assert!(matches!(
            random_inputs(3, 5..1),
            Err(RunError::Config(ConfigError::EmptyInputRange { .. }))
        ));
    }
}
