//! Per-run lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::{JobId, JobResult};

/// Unique identifier for a run, using ULID for chronological sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Create a new unique run ID.
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single run.
///
/// `Idle -> Running -> Draining -> Done`, with `Cancelled` reachable from
/// any non-terminal state. Terminal states are never left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Queues exist but nothing has started.
    #[default]
    Idle,
    /// Producer is enqueueing while workers compute.
    Running,
    /// Job queue is closed; workers finish and the collector drains.
    Draining,
    /// Every result has been collected.
    Done,
    /// The run stopped early.
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Cancelled)
    }

    /// Check whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Running) | (Running, Draining) | (Draining, Done)
        ) || (!self.is_terminal() && next == Cancelled)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Running => write!(f, "running"),
            RunState::Draining => write!(f, "draining"),
            RunState::Done => write!(f, "done"),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunStats {
    /// Jobs the producer put on the queue.
    pub enqueued: u64,
    /// Results that completed.
    pub completed: u64,
    /// Results that failed.
    pub failed: u64,
    /// Number of workers in the pool.
    pub workers: usize,
    /// Average job duration in milliseconds.
    pub avg_duration_ms: Option<f64>,
}

impl RunStats {
    /// Build stats from collected results.
    pub fn from_results(enqueued: u64, workers: usize, results: &[JobResult]) -> Self {
        let completed = results.iter().filter(|r| r.is_success()).count() as u64;
        let failed = results.len() as u64 - completed;
        let avg_duration_ms = if results.is_empty() {
            None
        } else {
            let total: u64 = results.iter().map(|r| r.duration_ms).sum();
            Some(total as f64 / results.len() as f64)
        };

        Self {
            enqueued,
            completed,
            failed,
            workers,
            avg_duration_ms,
        }
    }

    /// Total collected results.
    pub fn collected(&self) -> u64 {
        self.completed + self.failed
    }

    /// Success rate as a percentage.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.collected();
        if total == 0 {
            None
        } else {
            Some((self.completed as f64 / total as f64) * 100.0)
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub state: RunState,
    pub stats: RunStats,
    /// Results in collection order.
    pub results: Vec<JobResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Wall time of the run in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// `(job id, output)` pairs for every completed job, in collection order.
    pub fn outputs(&self) -> Vec<(JobId, i64)> {
        self.results
            .iter()
            .filter_map(|r| r.output().map(|out| (r.id(), out)))
            .collect()
    }

    /// Results that failed.
    pub fn failures(&self) -> impl Iterator<Item = &JobResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Results reordered by job id.
    pub fn sorted_results(&self) -> Vec<JobResult> {
        let mut results = self.results.clone();
        results.sort_by_key(|r| r.id());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Job;

    #[test]
    fn state_transitions() {
        assert!(RunState::Idle.can_transition_to(RunState::Running));
        assert!(RunState::Running.can_transition_to(RunState::Draining));
        assert!(RunState::Draining.can_transition_to(RunState::Done));
        assert!(RunState::Running.can_transition_to(RunState::Cancelled));

        assert!(!RunState::Idle.can_transition_to(RunState::Done));
        assert!(!RunState::Done.can_transition_to(RunState::Running));
        assert!(!RunState::Done.can_transition_to(RunState::Cancelled));
        assert!(!RunState::Cancelled.can_transition_to(RunState::Cancelled));
    }

    #[test]
    fn stats_from_results() {
        let results = vec![
            JobResult::completed(Job::new(0, 1), 1, "w").with_duration_ms(10),
            JobResult::completed(Job::new(1, 2), 2, "w").with_duration_ms(20),
            JobResult::failed(Job::new(2, 3), "nope", 1, "w").with_duration_ms(30),
        ];
        let stats = RunStats::from_results(3, 2, &results);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.collected(), 3);
        assert_eq!(stats.avg_duration_ms, Some(20.0));
        let rate = stats.success_rate().unwrap();
        assert!((rate - 66.666).abs() < 0.01);

        let empty = RunStats::from_results(0, 1, &[]);
        assert_eq!(empty.avg_duration_ms, None);
        assert_eq!(empty.success_rate(), None);
    }

    #[test]
    fn summary_outputs_skip_failures() {
        let now = Utc::now();
        let summary = RunSummary {
            run_id: RunId::new(),
            state: RunState::Done,
            stats: RunStats::default(),
            results: vec![
                JobResult::completed(Job::new(2, 11), 2, "w"),
                JobResult::failed(Job::new(0, 5), "bad", 1, "w"),
                JobResult::completed(Job::new(1, 9), 9, "w"),
            ],
            started_at: now,
            finished_at: now,
        };
        assert_eq!(summary.outputs(), vec![(JobId(2), 2), (JobId(1), 9)]);
        assert_eq!(summary.failures().count(), 1);
        let ids: Vec<u64> = summary.sorted_results().iter().map(|r| r.id().0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(summary.elapsed_ms(), 0);
    }
}
