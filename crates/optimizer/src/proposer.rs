//! Proposer trait and its inputs and outputs.

use crate::context::{SystemContext, TraceContext};
use crate::error::ProposalError;
use serde::{Deserialize, Serialize};
use tuneforge_history::History;
use tuneforge_options::{PartialConfiguration, ResolvedConfiguration};
use tuneforge_runner::BenchArgs;

/// Rolling resource usage of the benchmark process, as last observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub avg_cpu_percent: f64,
    pub avg_memory_mb: f64,
}

/// Everything a proposer may look at.
#[derive(Debug, Clone, Copy)]
pub struct ProposalContext<'a> {
    pub history: &'a History,
    /// Configuration the delta will be merged onto.
    pub current: &'a ResolvedConfiguration,
    pub system: &'a SystemContext,
    pub trace: Option<&'a TraceContext>,
    /// Workload arguments of the last committed run.
    pub bench_args: &'a BenchArgs,
    pub usage: ResourceUsage,
    pub test_name: &'a str,
    /// 1-based attempt number within the current iteration.
    pub attempt: u32,
}

/// A suggested change for the next run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Sparse, type-checked set of keys to change. Never empty.
    pub delta: PartialConfiguration,
    pub rationale: String,
    /// Workload argument overrides for the next run.
    pub next_args: BenchArgs,
}

/// Trait for configuration proposers.
pub trait Proposer {
    /// Name of this proposer.
    fn name(&self) -> &str;

    /// Propose a delta. Higher `temperature` asks for more exploratory
    /// suggestions; it rises after every failed attempt.
    fn propose(&self, ctx: &ProposalContext<'_>, temperature: f64) -> Result<Proposal, ProposalError>;
}

impl<P: Proposer + ?Sized> Proposer for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn propose(&self, ctx: &ProposalContext<'_>, temperature: f64) -> Result<Proposal, ProposalError> {
        (**self).propose(ctx, temperature)
    }
}
