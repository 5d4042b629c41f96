//! State owned by the control loop.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;
use tuneforge_history::{History, HistoryEntry, HistoryError, Metric};
use tuneforge_optimizer::ResourceUsage;
use tuneforge_runner::{BenchArgs, BenchmarkResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopState {
    Init,
    /// Working on the given 1-based iteration.
    Running(u32),
    Failed,
    Done,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::Init => f.write_str("INIT"),
            LoopState::Running(i) => write!(f, "RUNNING({})", i),
            LoopState::Failed => f.write_str("FAILED"),
            LoopState::Done => f.write_str("DONE"),
        }
    }
}

/// CPU and memory usage across committed runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RollingUsage {
    latest: ResourceUsage,
    cpu_total: f64,
    memory_total: f64,
    runs: u32,
}

impl RollingUsage {
    pub fn update(&mut self, result: &BenchmarkResult) {
        self.latest = ResourceUsage {
            avg_cpu_percent: result.avg_cpu_percent,
            avg_memory_mb: result.avg_memory_mb,
        };
        self.cpu_total += result.avg_cpu_percent;
        self.memory_total += result.avg_memory_mb;
        self.runs += 1;
    }

    /// Usage of the most recent committed run; fed to the next proposal.
    pub fn latest(&self) -> ResourceUsage {
        self.latest
    }

    /// Mean over every committed run.
    pub fn mean(&self) -> ResourceUsage {
        if self.runs == 0 {
            return ResourceUsage::default();
        }
        ResourceUsage {
            avg_cpu_percent: self.cpu_total / self.runs as f64,
            avg_memory_mb: self.memory_total / self.runs as f64,
        }
    }

    pub fn runs(&self) -> u32 {
        self.runs
    }
}

/// History, rolling aggregates, current workload arguments and loop state
/// of one tuning run.
#[derive(Debug, Clone)]
pub struct LoopContext {
    history: History,
    usage: RollingUsage,
    bench_args: BenchArgs,
    state: LoopState,
    attempts: u32,
}

impl LoopContext {
    pub fn new(metric: Metric, bench_args: BenchArgs) -> Self {
        Self {
            history: History::new(metric),
            usage: RollingUsage::default(),
            bench_args,
            state: LoopState::Init,
            attempts: 0,
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn usage(&self) -> &RollingUsage {
        &self.usage
    }

    /// Workload arguments for the next run.
    pub fn bench_args(&self) -> &BenchArgs {
        &self.bench_args
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Attempts made across all iterations, seed run included.
    pub fn total_attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn transition(&mut self, next: LoopState) {
        info!(from = %self.state, to = %next, "loop state change");
        self.state = next;
    }

    pub(crate) fn record_attempts(&mut self, count: u32) {
        self.attempts += count;
    }

    /// Append a successful run and adopt its workload arguments.
    pub(crate) fn commit(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let usage = entry.result.clone();
        let args = entry.bench_args.clone();
        self.history.append(entry)?;
        self.usage.update(&usage);
        self.bench_args = args;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_usage() {
        let mut usage = RollingUsage::default();
        assert_eq!(usage.mean(), ResourceUsage::default());
        usage.update(&BenchmarkResult::from_throughput(1.0, 100.0, 200.0));
        usage.update(&BenchmarkResult::from_throughput(1.0, 50.0, 400.0));
        assert_eq!(usage.latest().avg_cpu_percent, 50.0);
        assert_eq!(usage.mean().avg_cpu_percent, 75.0);
        assert_eq!(usage.mean().avg_memory_mb, 300.0);
        assert_eq!(usage.runs(), 2);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LoopState::Running(3).to_string(), "RUNNING(3)");
        assert_eq!(LoopState::Failed.to_string(), "FAILED");
    }
}
