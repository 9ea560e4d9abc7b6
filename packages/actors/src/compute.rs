//! Compute trait and adapters.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Result type for a single compute attempt.
pub type ComputeResult = Result<i64, String>;

/// Future type for async compute functions.
pub type ComputeFuture = Pin<Box<dyn Future<Output = ComputeResult> + Send>>;

/// Per-job computation run by every worker in the pool.
///
/// Implementations are shared across workers behind an `Arc`, so they must
/// be `Send + Sync`.
pub trait Compute: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Compute the output for one job input.
    fn compute(&self, input: i64) -> ComputeFuture;

    /// Called once per run before any worker starts. An error aborts the
    /// pool startup.
    fn prepare(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A compute function built from an async closure.
pub struct FnCompute<F>
where
    F: Fn(i64) -> ComputeFuture + Send + Sync + 'static,
{
    name: String,
    f: F,
}

impl<F> FnCompute<F>
where
    F: Fn(i64) -> ComputeFuture + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Compute for FnCompute<F>
where
    F: Fn(i64) -> ComputeFuture + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, input: i64) -> ComputeFuture {
        (self.f)(input)
    }
}

/// A compute function built from a plain synchronous closure.
pub struct SyncCompute<F>
where
    F: Fn(i64) -> ComputeResult + Send + Sync + 'static,
{
    name: String,
    f: F,
}

impl<F> SyncCompute<F>
where
    F: Fn(i64) -> ComputeResult + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Compute for SyncCompute<F>
where
    F: Fn(i64) -> ComputeResult + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, input: i64) -> ComputeFuture {
        let result = (self.f)(input);
        Box::pin(async move { result })
    }
}

/// Sum of the decimal digits of `number`, ignoring sign.
pub fn digit_sum(number: i64) -> i64 {
    let mut n = number.unsigned_abs();
    let mut sum = 0;
    while n != 0 {
        sum += (n % 10) as i64;
        n /= 10;
    }
    sum
}

/// Digit-sum compute with an optional simulated work delay.
#[derive(Debug, Clone, Default)]
pub struct DigitSum {
    delay: Option<Duration>,
}

impl DigitSum {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` before answering, standing in for real work.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Compute for DigitSum {
    fn name(&self) -> &str {
        "digit_sum"
    }

    fn compute(&self, input: i64) -> ComputeFuture {
        let delay = self.delay;
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok(digit_sum(input))
        })
    }
}

/// Build a [`FnCompute`] from an async block.
///
/// ```ignore
/// let double = compute_fn!("double", |x| Ok(x * 2));
/// ```
#[macro_export]
macro_rules! compute_fn {
    ($name:expr, |$input:ident| $body:expr) => {
        $crate::FnCompute::new($name, |$input: i64| {
            Box::pin(async move {
                let out: $crate::ComputeResult = $body;
                out
            })
        })
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_sums() {
        assert_eq!(digit_sum(0), 0);
        assert_eq!(digit_sum(7), 7);
        assert_eq!(digit_sum(998), 26);
        assert_eq!(digit_sum(-123), 6);
        assert_eq!(digit_sum(i64::MIN), 89);
    }

    #[tokio::test]
    async fn adapters_compute() {
        let sync = SyncCompute::new("neg", |x| if x < 0 { Err("negative".into()) } else { Ok(x) });
        assert_eq!(sync.name(), "neg");
        assert_eq!(sync.compute(3).await, Ok(3));
        assert_eq!(sync.compute(-1).await, Err("negative".to_string()));

        let double = compute_fn!("double", |x| Ok(x * 2));
        assert_eq!(double.name(), "double");
        assert_eq!(double.compute(21).await, Ok(42));

        assert_eq!(DigitSum::new().compute(456).await, Ok(15));
    }

    #[tokio::test(start_paused = true)]
    async fn digit_sum_honors_delay() {
        let started = tokio::time::Instant::now();
        let out = DigitSum::new()
            .with_delay(Duration::from_secs(2))
            .compute(12)
            .await;
        assert_eq!(out, Ok(3));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }
}
