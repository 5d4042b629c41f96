//! Benchmark runner for the storage engine under test.
//!
//! A run takes a [`ResolvedConfiguration`](tuneforge_options::ResolvedConfiguration)
//! and a set of workload arguments, executes the benchmark in a freshly
//! prepared workload directory while a background thread samples CPU and
//! memory, and classifies the outcome.
//!
//! ```text
//! prepare dir ──▶ write options ──▶ preload? ──▶ spawn ──▶ wait (timeout) ──▶ parse
//!                                                  │
//!                                                  └──▶ sampler thread (joined on every path)
//! ```

pub mod args;
pub mod error;
pub mod output;
pub mod result;
pub mod runner;
pub mod sampler;
pub mod workspace;

pub use args::BenchArgs;
pub use error::BenchmarkFailure;
pub use output::{parse_output, WorkloadMetrics};
pub use result::{BenchmarkResult, ResourceSample};
pub use runner::{BenchmarkRunner, DbBenchRunner, RunnerOptions};
pub use sampler::ResourceSampler;
pub use workspace::WorkloadDir;
