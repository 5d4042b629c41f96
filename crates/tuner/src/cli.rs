//! CLI wiring for the tuner.

use crate::config::{MergeBase, TunerConfig};
use crate::error::{StartupError, TuneError};
use crate::report::sparkline;
use crate::retry::RetryPolicy;
use crate::tuner::Tuner;
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tuneforge_history::Metric;
use tuneforge_optimizer::{HeuristicProposer, LlmProposer, Proposer, SystemContext};
use tuneforge_runner::{BenchArgs, DbBenchRunner, RunnerOptions};

#[derive(Parser, Debug)]
#[command(name = "tuneforge", about = "LLM-guided RocksDB configuration tuner")]
pub struct Cli {
    /// Proposal iterations after the seed run.
    #[arg(long, env = "TUNEFORGE_ITERATIONS", default_value_t = 10)]
    pub iterations: u32,

    #[arg(long, env = "TUNEFORGE_OUTPUT", default_value = "output")]
    pub output: PathBuf,

    /// Benchmark executable.
    #[arg(long, env = "TUNEFORGE_DB_BENCH", default_value = "db_bench")]
    pub db_bench: PathBuf,

    /// Database directory, wiped before every run.
    #[arg(long, env = "TUNEFORGE_DB_PATH", default_value = "/tmp/tuneforge/db")]
    pub db_path: PathBuf,

    /// Benchmark to run (`--benchmarks` of db_bench).
    #[arg(long, env = "TUNEFORGE_TEST_NAME", default_value = "fillrandom")]
    pub test_name: String,

    /// Starting options file; the built-in default when omitted.
    #[arg(long)]
    pub seed: Option<PathBuf>,

    #[arg(long, env = "TUNEFORGE_TRACE")]
    pub trace: Option<PathBuf>,

    /// Command that loads the database before each run. Required with --trace.
    #[arg(long, env = "TUNEFORGE_PRELOAD_CMD")]
    pub preload_cmd: Option<String>,

    /// Have the benchmark record an operation trace during the seed and
    /// every later run; the seed's trace is summarized for the proposer.
    #[arg(long, env = "TUNEFORGE_RECORD_TRACE")]
    pub record_trace: bool,

    /// Saved fio output describing the storage device.
    #[arg(long, env = "TUNEFORGE_FIO_RESULT")]
    pub fio_result: Option<PathBuf>,

    /// Extra db_bench flag as key=value; repeatable.
    #[arg(long = "bench-arg", value_name = "KEY=VALUE", allow_hyphen_values = true)]
    pub bench_args: Vec<String>,

    #[arg(long, value_enum, default_value = "llm")]
    pub proposer: ProposerArg,

    #[arg(long, value_enum, default_value = "latest")]
    pub merge_base: MergeBase,

    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    #[arg(long, default_value_t = 0.4)]
    pub start_temperature: f64,

    #[arg(long, default_value_t = 0.1)]
    pub temperature_step: f64,

    /// Past iterations included in each prompt.
    #[arg(long, default_value_t = 8)]
    pub history_window: usize,

    /// Hard limit per benchmark run.
    #[arg(long, default_value_t = 1800)]
    pub timeout_secs: u64,

    #[arg(long, default_value_t = 1000)]
    pub sample_interval_ms: u64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposerArg {
    /// OpenAI-compatible endpoint from TUNEFORGE_LLM_* variables.
    Llm,
    /// Deterministic offline adjustments.
    Heuristic,
}

impl Cli {
    pub fn tuner_config(&self) -> Result<TunerConfig> {
        let bench_args = BenchArgs::parse(self.bench_args.iter().map(String::as_str))
            .map_err(|e| anyhow::anyhow!("invalid --bench-arg: {}", e))?;
        Ok(TunerConfig {
            iterations: self.iterations,
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                start_temperature: self.start_temperature,
                temperature_step: self.temperature_step,
            },
            merge_base: self.merge_base,
            metric: Metric::OpsPerSec,
            output_dir: self.output.clone(),
            test_name: self.test_name.clone(),
            seed: self.seed.clone(),
            trace: self.trace.clone(),
            preload_cmd: self.preload_cmd.clone(),
            bench_args,
        })
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            executable: self.db_bench.clone(),
            db_path: self.db_path.clone(),
            benchmarks: self.test_name.clone(),
            artifacts_dir: self.output.join("runs"),
            timeout: Duration::from_secs(self.timeout_secs),
            sample_interval: Duration::from_millis(self.sample_interval_ms.max(10)),
            preload_cmd: self.preload_cmd.clone(),
            record_trace: self.record_trace,
        }
    }

    fn build_proposer(&self) -> Result<Box<dyn Proposer>> {
        let proposer: Box<dyn Proposer> = match self.proposer {
            ProposerArg::Llm => Box::new(LlmProposer::from_env()?.with_history_window(self.history_window)),
            ProposerArg::Heuristic => Box::new(HeuristicProposer),
        };
        Ok(proposer)
    }
}

/// Log to stderr and to `<output>/tuneforge.log`.
fn init_tracing(output: &std::path::Path) -> Result<()> {
    fs::create_dir_all(output).with_context(|| format!("creating {}", output.display()))?;
    let log_path = output.join("tuneforge.log");
    let log_file = File::create(&log_path).with_context(|| format!("creating {}", log_path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(log_file)),
        )
        .try_init();
    Ok(())
}

pub fn run_cli(cli: Cli) -> Result<()> {
    init_tracing(&cli.output).map_err(TuneError::Persist)?;

    let invalid = |e: anyhow::Error| TuneError::from(StartupError::Invalid(format!("{:#}", e)));
    let config = cli.tuner_config().map_err(invalid)?;
    let proposer = cli.build_proposer().map_err(invalid)?;
    let system = SystemContext::probe(&cli.db_path, cli.fio_result.as_deref());
    info!(
        cpus = system.cpu_count,
        memory_mb = system.total_memory_mb,
        storage = system.storage.as_deref().unwrap_or("unknown"),
        "probed host"
    );

    let runner = DbBenchRunner::new(cli.runner_options());
    let mut tuner = Tuner::new(config, runner, proposer, system).map_err(TuneError::from)?;
    let mut ctx = tuner.context();
    tuner.run(&mut ctx)?;

    let history = ctx.history();
    if let Some(best) = history.best() {
        println!(
            "best: iteration {} at {:.2} ops/sec ({} iterations, {} attempts)",
            best.iteration,
            best.result.ops_per_sec,
            history.len(),
            ctx.total_attempts()
        );
    }
    println!("trend: {}", sparkline(history.series(history.metric())));
    println!("artifacts: {}", cli.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_builds_config() {
        let cli = Cli::parse_from([
            "tuneforge",
            "--iterations",
            "3",
            "--bench-arg",
            "num=1000",
            "--bench-arg",
            "--threads=4",
            "--merge-base",
            "best",
            "--proposer",
            "heuristic",
            "--record-trace",
        ]);
        let config = cli.tuner_config().unwrap();
        assert_eq!(config.iterations, 3);
        assert_eq!(config.merge_base, MergeBase::Best);
        assert_eq!(config.bench_args.get("threads"), Some("4"));
        assert_eq!(cli.runner_options().benchmarks, "fillrandom");
        assert!(cli.runner_options().artifacts_dir.ends_with("runs"));
        assert!(cli.runner_options().record_trace);
    }

    #[test]
    fn test_bad_bench_arg_is_rejected() {
        let cli = Cli::parse_from(["tuneforge", "--bench-arg", "novalue"]);
        assert!(cli.tuner_config().is_err());
    }
}
