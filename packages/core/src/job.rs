//! Job domain types for work items flowing through the pool.

use serde::{Deserialize, Serialize};

/// Identifier for a job, unique within a single run.
///
/// The producer assigns ids in submission order starting at zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique identifier for this job within its run.
    pub id: JobId,
    /// Input value handed to the compute function.
    pub input: i64,
}

impl Job {
    pub fn new(id: u64, input: i64) -> Self {
        Self {
            id: JobId(id),
            input,
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Compute returned a value.
    Completed { output: i64 },
    /// Compute failed on every attempt.
    Failed { error: String, attempts: u32 },
}

/// The outcome of processing one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// The job this result belongs to.
    pub job: Job,
    /// What compute produced.
    #[serde(flatten)]
    pub outcome: JobOutcome,
    /// Worker that processed the job.
    pub worker_id: String,
    /// Wall time spent on the job, retries included.
    pub duration_ms: u64,
}

impl JobResult {
    pub fn completed(job: Job, output: i64, worker_id: impl Into<String>) -> Self {
        Self {
            job,
            outcome: JobOutcome::Completed { output },
            worker_id: worker_id.into(),
            duration_ms: 0,
        }
    }

    pub fn failed(
        job: Job,
        error: impl Into<String>,
        attempts: u32,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            job,
            outcome: JobOutcome::Failed {
                error: error.into(),
                attempts,
            },
            worker_id: worker_id.into(),
            duration_ms: 0,
        }
    }

    /// Set the measured duration.
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn id(&self) -> JobId {
        self.job.id
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Completed { .. })
    }

    /// The computed output, if the job completed.
    pub fn output(&self) -> Option<i64> {
        match self.outcome {
            JobOutcome::Completed { output } => Some(output),
            JobOutcome::Failed { .. } => None,
        }
    }

    /// The final error, if the job failed.
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Completed { .. } => None,
            JobOutcome::Failed { error, .. } => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_accessors() {
        let job = Job::new(7, 123);
        let ok = JobResult::completed(job, 6, "worker-1").with_duration_ms(12);
        assert!(ok.is_success());
        assert_eq!(ok.output(), Some(6));
        assert_eq!(ok.error(), None);
        assert_eq!(ok.id(), JobId(7));
        assert_eq!(ok.duration_ms, 12);

        let bad = JobResult::failed(job, "boom", 2, "worker-3");
        assert!(!bad.is_success());
        assert_eq!(bad.output(), None);
        assert_eq!(bad.error(), Some("boom"));
    }

    #[test]
    fn result_serializes_flat() {
        let result = JobResult::completed(Job::new(1, 45), 9, "worker-2");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["output"], 9);
        assert_eq!(value["job"]["id"], 1);
        assert_eq!(value["job"]["input"], 45);
    }
}
