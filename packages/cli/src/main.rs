//! fanout CLI entry point.
//!
//! Usage:
//!   fanout                            # 100 jobs on 20 workers
//!   fanout --jobs 500 --workers 8     # Custom pool size
//!   fanout --delay-ms 2000            # Simulate slow jobs
//!   fanout --json                     # Print the run summary as JSON

use std::process::ExitCode;
use std::time::{Duration, Instant};

use actors::{CancellationToken, DigitSum, JobRunner, RANDOM_INPUT_RANGE, random_inputs};
use anyhow::{Context, Result, bail};
use pool_core::{FailurePolicy, JobOutcome, JobResult, RunConfig, RunStats};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, PartialEq)]
struct Options {
    jobs: u64,
    workers: usize,
    queue_capacity: usize,
    delay_ms: u64,
    retries: u32,
    timeout_ms: Option<u64>,
    abort: bool,
    json: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            jobs: 100,
            workers: 20,
            queue_capacity: 10,
            delay_ms: 0,
            retries: 0,
            timeout_ms: None,
            abort: false,
            json: false,
        }
    }
}

impl Options {
    fn config(&self) -> RunConfig {
        let mut config = RunConfig::with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_max_retries(self.retries);
        if let Some(timeout_ms) = self.timeout_ms {
            config = config.with_job_timeout_ms(timeout_ms);
        }
        if self.abort {
            config = config.with_failure_policy(FailurePolicy::Abort);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(opts) = parse_args(&args)? else {
        print_help();
        return Ok(ExitCode::SUCCESS);
    };

    let mut compute = DigitSum::new();
    if opts.delay_ms > 0 {
        compute = compute.with_delay(Duration::from_millis(opts.delay_ms));
    }

    // Ctrl-C cancels the run; results collected so far are discarded.
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling run");
            ctrl_c.cancel();
        }
    });

    let mut runner = JobRunner::new(opts.config(), compute).with_cancellation(cancel);
    if !opts.json {
        runner = runner.on_result(|result| println!("{}", format_result(result)));
    }

    let started = Instant::now();
    let summary = runner
        .run(random_inputs(opts.jobs, RANDOM_INPUT_RANGE)?)
        .await
        .context("run failed")?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("total time taken {} seconds", started.elapsed().as_secs_f64());
        println!("{}", format_stats(&summary.stats));
    }

    if summary.stats.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn format_result(result: &JobResult) -> String {
    match &result.outcome {
        JobOutcome::Completed { output } => format!(
            "Job id {}, input random no {} , sum of digits {}",
            result.job.id, result.job.input, output
        ),
        JobOutcome::Failed { error, attempts } => format!(
            "Job id {}, input random no {} , failed after {} attempts: {}",
            result.job.id, result.job.input, attempts, error
        ),
    }
}

fn format_stats(stats: &RunStats) -> String {
    match stats.success_rate() {
        Some(rate) => format!(
            "{} completed, {} failed, success rate {:.1}%",
            stats.completed, stats.failed, rate
        ),
        None => "no jobs run".to_string(),
    }
}

/// Parse command-line flags. Returns `None` when help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag, Some(value.to_string())),
            None => (arg.as_str(), None),
        };
        let mut value = |name: &str| -> Result<String> {
            match inline.clone() {
                Some(v) => Ok(v),
                None => iter
                    .next()
                    .cloned()
                    .with_context(|| format!("{} requires a value", name)),
            }
        };

        match flag {
            "--help" | "-h" => return Ok(None),
            "--jobs" | "-n" => opts.jobs = value(flag)?.parse().context("invalid --jobs")?,
            "--workers" | "-w" => {
                opts.workers = value(flag)?.parse().context("invalid --workers")?
            }
            "--queue-capacity" => {
                opts.queue_capacity = value(flag)?.parse().context("invalid --queue-capacity")?
            }
            "--delay-ms" => opts.delay_ms = value(flag)?.parse().context("invalid --delay-ms")?,
            "--retries" => opts.retries = value(flag)?.parse().context("invalid --retries")?,
            "--timeout-ms" => {
                opts.timeout_ms = Some(value(flag)?.parse().context("invalid --timeout-ms")?)
            }
            "--abort" => opts.abort = true,
            "--json" => opts.json = true,
            other => bail!("unknown argument: {}", other),
        }
    }

    Ok(Some(opts))
}

fn print_help() {
    println!(
        r#"fanout - run random digit-sum jobs across a bounded worker pool

USAGE:
    fanout [OPTIONS]

OPTIONS:
    -n, --jobs <N>             Number of jobs (default 100)
    -w, --workers <W>          Number of workers (default 20)
        --queue-capacity <C>   Capacity of both queues (default 10)
        --delay-ms <MS>        Simulated work per job (default 0)
        --retries <R>          Extra attempts for failing jobs (default 0)
        --timeout-ms <MS>      Per-attempt timeout
        --abort                Stop the run on the first failed job
        --json                 Print the run summary as JSON
    -h, --help                 Print this help

Set RUST_LOG=info (or debug) for progress logs on stderr."#
    );
}
