//! Benchmark results.

use crate::output::WorkloadMetrics;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One resource usage observation of the benchmark process.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    /// Milliseconds since the process was launched.
    pub elapsed_ms: u64,
    /// CPU utilisation over the last interval, 100.0 = one core.
    pub cpu_percent: f64,
    /// Resident set size in MiB.
    pub memory_mb: f64,
}

/// Outcome of a successful benchmark run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Primary throughput metric.
    pub ops_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub micros_per_op: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mb_per_sec: Option<f64>,
    /// Every phase the benchmark reported.
    pub workloads: Vec<WorkloadMetrics>,
    pub samples: Vec<ResourceSample>,
    pub avg_cpu_percent: f64,
    pub avg_memory_mb: f64,
    pub wall_time_ms: f64,
    /// Raw benchmark output.
    pub output_path: PathBuf,
    /// Operation trace the benchmark recorded, if tracing was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_path: Option<PathBuf>,
}

impl BenchmarkResult {
    /// Assemble a result, deriving the resource averages from `samples`.
    pub fn new(
        primary: &WorkloadMetrics,
        workloads: Vec<WorkloadMetrics>,
        samples: Vec<ResourceSample>,
        wall_time_ms: f64,
        output_path: impl AsRef<Path>,
    ) -> Self {
        let (avg_cpu_percent, avg_memory_mb) = averages(&samples);
        Self {
            ops_per_sec: primary.ops_per_sec,
            micros_per_op: primary.micros_per_op,
            mb_per_sec: primary.mb_per_sec,
            workloads,
            samples,
            avg_cpu_percent,
            avg_memory_mb,
            wall_time_ms,
            output_path: output_path.as_ref().to_path_buf(),
            trace_path: None,
        }
    }

    pub fn with_trace(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = Some(path.into());
        self
    }

    /// A result carrying only a throughput figure and resource averages.
    /// Used by synthetic runners and tests.
    pub fn from_throughput(ops_per_sec: f64, avg_cpu_percent: f64, avg_memory_mb: f64) -> Self {
        Self {
            ops_per_sec,
            micros_per_op: None,
            mb_per_sec: None,
            workloads: Vec::new(),
            samples: Vec::new(),
            avg_cpu_percent,
            avg_memory_mb,
            wall_time_ms: 0.0,
            output_path: PathBuf::new(),
            trace_path: None,
        }
    }
}

fn averages(samples: &[ResourceSample]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let cpu = samples.iter().map(|s| s.cpu_percent).sum::<f64>() / n;
    let mem = samples.iter().map(|s| s.memory_mb).sum::<f64>() / n;
    (cpu, mem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_averages_from_samples() {
        let primary = WorkloadMetrics {
            name: "fillrandom".into(),
            ops_per_sec: 1000.0,
            micros_per_op: Some(1.0),
            mb_per_sec: None,
        };
        let samples = vec![
            ResourceSample { elapsed_ms: 100, cpu_percent: 50.0, memory_mb: 100.0 },
            ResourceSample { elapsed_ms: 200, cpu_percent: 150.0, memory_mb: 300.0 },
        ];
        let result = BenchmarkResult::new(&primary, vec![primary.clone()], samples, 250.0, "out.log");
        assert_eq!(result.avg_cpu_percent, 100.0);
        assert_eq!(result.avg_memory_mb, 200.0);
        assert_eq!(result.ops_per_sec, 1000.0);
    }

    #[test]
    fn test_no_samples_average_to_zero() {
        let result = BenchmarkResult::from_throughput(10.0, 0.0, 0.0);
        assert_eq!(averages(&result.samples), (0.0, 0.0));
    }
}
