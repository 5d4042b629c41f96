//! TuneForge: LLM-guided tuning of storage engine configurations.
//!
//! Facade over the workspace crates. See [`tuneforge_tuner::Tuner`] for the
//! control loop that ties them together.

pub use tuneforge_history as history;
pub use tuneforge_optimizer as optimizer;
pub use tuneforge_options as options;
pub use tuneforge_runner as runner;
pub use tuneforge_tuner as tuner;
