//! Benchmark failure classification.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Why a benchmark run did not produce a result.
///
/// Every variant is retry-eligible; callers must not treat one kind of
/// failure differently from another.
#[derive(Debug, Error)]
pub enum BenchmarkFailure {
    #[error("failed to prepare workload at {path}: {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("preload command failed: {detail}")]
    Preload { detail: String },

    #[error("benchmark exited with status {}: {output_tail}", .code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into()))]
    NonZeroExit {
        code: Option<i32>,
        output_tail: String,
    },

    #[error("benchmark output {} has no throughput metric", .output.display())]
    MissingMetric { output: PathBuf },

    #[error("benchmark exceeded timeout of {after:?} and was killed")]
    Timeout { after: Duration },
}

impl BenchmarkFailure {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BenchmarkFailure::Workspace { .. } => "workspace",
            BenchmarkFailure::Spawn { .. } => "spawn",
            BenchmarkFailure::Preload { .. } => "preload",
            BenchmarkFailure::NonZeroExit { .. } => "non_zero_exit",
            BenchmarkFailure::MissingMetric { .. } => "missing_metric",
            BenchmarkFailure::Timeout { .. } => "timeout",
        }
    }
}
