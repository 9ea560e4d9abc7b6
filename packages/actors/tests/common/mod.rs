#![allow(dead_code)]

use std::collections::HashMap;
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;

use actors::{ActorRef, Compute, ComputeFuture, CoordinatorMessage, PoolStatus};
use pool_core::{RunEvent, RunSummary};
use ractor::rpc::CallResult;
use tokio::sync::broadcast;

/// Job ids of a summary, sorted.
pub fn sorted_ids(summary: &RunSummary) -> Vec<u64> {
    let mut ids: Vec<u64> = summary.results.iter().map(|r| r.id().0).collect();
    ids.sort_unstable();
    ids
}

/// Everything currently buffered on an event receiver.
pub fn drain_events(rx: &mut broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Ask a coordinator for its pool status.
pub async fn pool_status(
    coordinator: &ActorRef<CoordinatorMessage>,
) -> Result<PoolStatus, Box<dyn Error>> {
    match ractor::rpc::call(
        coordinator,
        |reply| CoordinatorMessage::GetStatus { reply },
        Some(Duration::from_secs(5)),
    )
    .await?
    {
        CallResult::Success(status) => Ok(status),
        _ => Err("status call did not succeed".into()),
    }
}

/// Number of `WorkerExited` events, and how many of them carry an error.
pub fn worker_exits(events: &[RunEvent]) -> (usize, usize) {
    let mut exited = 0;
    let mut crashed = 0;
    for event in events {
        if let RunEvent::WorkerExited { error, .. } = event {
            exited += 1;
            if error.is_some() {
                crashed += 1;
            }
        }
    }
    (exited, crashed)
}

/// Compute that can never get ready, so the pool refuses to start.
pub struct Unprepared;

impl Compute for Unprepared {
    fn name(&self) -> &str {
        "unprepared"
    }

    fn compute(&self, input: i64) -> ComputeFuture {
        Box::pin(async move { Ok(input) })
    }

    fn prepare(&self) -> Result<(), String> {
        Err("model not loaded".to_string())
    }
}

/// Fails the first `failures` attempts for every input, then doubles it.
pub struct Flaky {
    failures: u32,
    seen: Mutex<HashMap<i64, u32>>,
}

impl Flaky {
    pub fn new(failures: u32) -> Self {
        Self {
            failures,
            seen: Mutex::new(HashMap::new()),
        }
    }
}

impl Compute for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn compute(&self, input: i64) -> ComputeFuture {
        let attempt = {
            let mut seen = self.seen.lock().unwrap();
            let count = seen.entry(input).or_insert(0);
            *count += 1;
            *count
        };
        let failures = self.failures;
        Box::pin(async move {
            if attempt <= failures {
                Err(format!("attempt {} failed", attempt))
            } else {
                Ok(input * 2)
            }
        })
    }
}
