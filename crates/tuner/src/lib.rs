//! Iterative tuning control loop.
//!
//! Seeds a configuration, benchmarks it, then repeatedly asks a proposer for
//! a change, merges it, benchmarks the result and commits it to the
//! history. Each iteration gets a bounded number of attempts with rising
//! temperature; running out of attempts ends the whole run.

pub mod artifacts;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod report;
pub mod retry;
pub mod tuner;

pub use artifacts::ArtifactWriter;
#[cfg(feature = "cli")]
pub use cli::*;
pub use config::{MergeBase, TunerConfig};
pub use context::{LoopContext, LoopState, RollingUsage};
pub use error::{AttemptError, StartupError, TuneError};
pub use retry::{attempt, Attempt, RetryExhausted, RetryPolicy};
pub use tuner::Tuner;
