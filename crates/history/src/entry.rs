//! A committed iteration.

use serde::{Deserialize, Serialize};
use tuneforge_options::{ConfigDiff, ResolvedConfiguration};
use tuneforge_runner::{BenchArgs, BenchmarkResult};

/// Configuration, result and rationale of one successful iteration.
///
/// Iteration 0 is the seed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub iteration: u32,
    pub configuration: ResolvedConfiguration,
    pub result: BenchmarkResult,
    pub rationale: String,
    /// Changed keys relative to the previous entry; empty for the seed.
    pub delta: ConfigDiff,
    /// Workload arguments the run used.
    pub bench_args: BenchArgs,
}

impl HistoryEntry {
    pub fn new(
        iteration: u32,
        configuration: ResolvedConfiguration,
        result: BenchmarkResult,
        rationale: impl Into<String>,
        delta: ConfigDiff,
        bench_args: BenchArgs,
    ) -> Self {
        Self {
            iteration,
            configuration,
            result,
            rationale: rationale.into(),
            delta,
            bench_args,
        }
    }
}
