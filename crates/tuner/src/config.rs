//! Tuning run settings.

use crate::error::StartupError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;
use tuneforge_history::Metric;
use tuneforge_runner::BenchArgs;

/// Test name expected for trace-driven runs.
pub const TRACE_TEST_NAME: &str = "tracefile";

/// Which committed configuration new proposals are merged onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum MergeBase {
    /// The most recently committed configuration.
    #[default]
    Latest,
    /// The best configuration so far by the ranking metric.
    Best,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Number of proposal iterations after the seed run.
    pub iterations: u32,
    pub retry: RetryPolicy,
    pub merge_base: MergeBase,
    /// Ranking metric for the best configuration.
    pub metric: Metric,
    pub output_dir: PathBuf,
    /// Benchmark name passed to the proposer (`fillrandom`, `tracefile`, ...).
    pub test_name: String,
    /// Seed options file; the built-in default when unset.
    pub seed: Option<PathBuf>,
    pub trace: Option<PathBuf>,
    /// Shell command that loads the database before each run.
    pub preload_cmd: Option<String>,
    /// Workload arguments for the first run.
    pub bench_args: BenchArgs,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            retry: RetryPolicy::default(),
            merge_base: MergeBase::default(),
            metric: Metric::default(),
            output_dir: PathBuf::from("output"),
            test_name: "fillrandom".into(),
            seed: None,
            trace: None,
            preload_cmd: None,
            bench_args: BenchArgs::new(),
        }
    }
}

impl TunerConfig {
    /// Check arguments that must hold before any benchmark runs.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.retry.max_attempts == 0 {
            return Err(StartupError::Invalid("retry budget must be at least 1".into()));
        }
        if !(self.retry.start_temperature.is_finite() && self.retry.temperature_step.is_finite()) {
            return Err(StartupError::Invalid("temperatures must be finite".into()));
        }
        if self.test_name.trim().is_empty() {
            return Err(StartupError::Invalid("test name must not be empty".into()));
        }

        if self.trace.is_some() {
            let preload = self.preload_cmd.as_deref().map(str::trim).unwrap_or("");
            if preload.is_empty() {
                return Err(StartupError::MissingPreload);
            }
            if self.test_name != TRACE_TEST_NAME {
                warn!(
                    test_name = %self.test_name,
                    expected = TRACE_TEST_NAME,
                    "trace file given but the test name is not the trace test"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_requires_preload() {
        let mut config = TunerConfig {
            trace: Some("trace.txt".into()),
            test_name: TRACE_TEST_NAME.into(),
            ..TunerConfig::default()
        };
        assert!(matches!(config.validate(), Err(StartupError::MissingPreload)));

        config.preload_cmd = Some("   ".into());
        assert!(matches!(config.validate(), Err(StartupError::MissingPreload)));

        config.preload_cmd = Some("./load.sh".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = TunerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.merge_base, MergeBase::Latest);
    }
}
