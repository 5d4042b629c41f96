//! Control loop errors and process exit codes.

use std::path::PathBuf;
use thiserror::Error;
use tuneforge_history::HistoryError;
use tuneforge_optimizer::ProposalError;
use tuneforge_options::SchemaError;
use tuneforge_runner::BenchmarkFailure;

/// A required startup argument is missing or unusable. Raised before any
/// benchmark runs.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("a trace file was given without a preload command; trace-driven runs need one to load the database")]
    MissingPreload,

    #[error("cannot read trace file {path}: {source}")]
    Trace {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("cannot read seed options {path}: {source}")]
    Seed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid argument: {0}")]
    Invalid(String),
}

/// One failed attempt within an iteration. Both kinds are retried the same
/// way.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Proposal(#[from] ProposalError),

    #[error(transparent)]
    Benchmark(#[from] BenchmarkFailure),
}

impl AttemptError {
    pub fn kind(&self) -> &'static str {
        match self {
            AttemptError::Proposal(e) => e.kind(),
            AttemptError::Benchmark(e) => e.kind(),
        }
    }
}

/// Why a tuning run stopped early.
#[derive(Debug, Error)]
pub enum TuneError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("seed configuration failed to benchmark: {0}")]
    SeedFailed(#[source] BenchmarkFailure),

    #[error("iteration {iteration} made no progress after {attempts} attempts; last error: {last_error}")]
    Exhausted {
        iteration: u32,
        attempts: u32,
        last_error: AttemptError,
    },

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("failed to persist artifacts: {0:#}")]
    Persist(#[from] anyhow::Error),
}

impl TuneError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            TuneError::SeedFailed(_) => 1,
            TuneError::Exhausted { .. } => 2,
            TuneError::Startup(_) => 3,
            TuneError::Schema(_) => 4,
            TuneError::History(_) | TuneError::Persist(_) => 5,
        }
    }
}
