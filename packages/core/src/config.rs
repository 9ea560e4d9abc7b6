//! Run configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the runner does when a job fails after all its attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Deliver an error-tagged result and keep going.
    #[default]
    Report,
    /// Cancel the run on the first failed result.
    Abort,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Report => write!(f, "report"),
            FailurePolicy::Abort => write!(f, "abort"),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("{queue} capacity must be at least 1")]
    ZeroCapacity { queue: &'static str },
    #[error("input range {start}..{end} is empty")]
    EmptyInputRange { start: i64, end: i64 },
}

/// Configuration for a single run of the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of concurrent workers.
    pub worker_count: usize,
    /// Capacity of the bounded job queue.
    pub job_queue_capacity: usize,
    /// Capacity of the bounded result queue.
    pub result_queue_capacity: usize,
    /// Extra attempts for a job whose compute fails.
    pub max_retries: u32,
    /// Per-attempt timeout in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_timeout_ms: Option<u64>,
    /// Behavior on a failed job.
    pub failure_policy: FailurePolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            job_queue_capacity: 10,
            result_queue_capacity: 10,
            max_retries: 0,
            job_timeout_ms: None,
            failure_policy: FailurePolicy::Report,
        }
    }
}

impl RunConfig {
    /// Create a config with the given worker count and defaults elsewhere.
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Set both queue capacities.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = capacity;
        self.result_queue_capacity = capacity;
        self
    }

    pub fn with_job_queue_capacity(mut self, capacity: usize) -> Self {
        self.job_queue_capacity = capacity;
        self
    }

    pub fn with_result_queue_capacity(mut self, capacity: usize) -> Self {
        self.result_queue_capacity = capacity;
        self
    }

    /// Set the number of extra attempts for failing jobs.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_job_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.job_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check that the config describes a runnable pool.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.job_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { queue: "job queue" });
        }
        if self.result_queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                queue: "result queue",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = RunConfig::default();
        assert_eq!(config.job_queue_capacity, 10);
        assert_eq!(config.failure_policy, FailurePolicy::Report);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unrunnable_configs() {
        assert_eq!(
            RunConfig::with_workers(0).validate(),
            Err(ConfigError::NoWorkers)
        );
        assert_eq!(
            RunConfig::with_workers(2)
                .with_job_queue_capacity(0)
                .validate(),
            Err(ConfigError::ZeroCapacity { queue: "job queue" })
        );
        assert_eq!(
            RunConfig::with_workers(2)
                .with_result_queue_capacity(0)
                .validate(),
            Err(ConfigError::ZeroCapacity {
                queue: "result queue"
            })
        );
    }

    #[test]
    fn deserializes_partial_json() {
        let config: RunConfig =
            serde_json::from_str(r#"{"worker_count": 20, "failure_policy": "abort"}"#).unwrap();
        assert_eq!(config.worker_count, 20);
        assert_eq!(config.failure_policy, FailurePolicy::Abort);
        assert_eq!(config.result_queue_capacity, 10);
        assert_eq!(config.job_timeout_ms, None);
    }
}
