//! Deterministic proposer that needs no network.

use crate::error::ProposalError;
use crate::proposer::{Proposal, ProposalContext, Proposer};
use tuneforge_options::{PartialConfiguration, Section, Value};
use tuneforge_runner::BenchArgs;

/// One rung of the adjustment ladder.
struct Step {
    section: Section,
    key: &'static str,
    adjust: fn(i128, &ProposalContext<'_>) -> i128,
    why: &'static str,
}

const MIB: i128 = 1 << 20;

fn cores(ctx: &ProposalContext<'_>) -> i128 {
    ctx.system.cpu_count.max(1) as i128
}

fn half_memory_bytes(ctx: &ProposalContext<'_>) -> i128 {
    ctx.system
        .total_memory_mb
        .map(|mb| mb as i128 * MIB / 2)
        .unwrap_or(1024 * MIB)
}

const LADDER: &[Step] = &[
    Step {
        section: Section::CfOptions,
        key: "write_buffer_size",
        adjust: |v, _| (v * 2).min(1024 * MIB),
        why: "larger memtables mean fewer flushes and less write amplification",
    },
    Step {
        section: Section::DbOptions,
        key: "max_background_jobs",
        adjust: |v, ctx| (v + 2).min(cores(ctx) * 2),
        why: "more background jobs let flushes and compactions keep up",
    },
    Step {
        section: Section::DbBench,
        key: "cache_size",
        adjust: |v, ctx| (v.max(MIB) * 4).min(half_memory_bytes(ctx)),
        why: "a larger block cache serves more reads from memory",
    },
    Step {
        section: Section::CfOptions,
        key: "max_write_buffer_number",
        adjust: |v, _| (v + 1).min(8),
        why: "extra immutable memtables absorb write bursts while flushing",
    },
    Step {
        section: Section::TableOptions,
        key: "block_size",
        adjust: |v, _| (v * 2).min(64 * 1024),
        why: "bigger blocks shrink the index and favour sequential access",
    },
    Step {
        section: Section::DbOptions,
        key: "max_subcompactions",
        adjust: |v, ctx| (v + 1).min(cores(ctx)),
        why: "subcompactions parallelise large L0 to L1 compactions",
    },
    Step {
        section: Section::DbOptions,
        key: "bytes_per_sync",
        adjust: |v, _| if v == 0 { MIB } else { v },
        why: "incremental syncing smooths out write stalls",
    },
    Step {
        section: Section::CfOptions,
        key: "level0_file_num_compaction_trigger",
        adjust: |v, _| (v + 2).min(16),
        why: "delaying L0 compaction batches more work per compaction",
    },
];

/// Walks a fixed ladder of single-key adjustments, one rung per committed
/// iteration. Retries at higher temperature skip further down the ladder.
#[derive(Debug, Default)]
pub struct HeuristicProposer;

impl Proposer for HeuristicProposer {
    fn name(&self) -> &str {
        "heuristic"
    }

    /// Walks the ladder by committed iterations and retries; `temperature`
    /// is ignored.
    fn propose(&self, ctx: &ProposalContext<'_>, _temperature: f64) -> Result<Proposal, ProposalError> {
        let retries = ctx.attempt.saturating_sub(1) as usize;
        let start = ctx.history.len().saturating_sub(1) + retries;

        for offset in 0..LADDER.len() {
            let step = &LADDER[(start + offset) % LADDER.len()];
            let Some(Value::Int(current)) = ctx.current.get(step.section, step.key) else {
                continue;
            };
            let next = (step.adjust)(*current, ctx);
            if next == *current {
                continue;
            }
            let delta = PartialConfiguration::new().with(step.section, step.key, Value::Int(next));
            return Ok(Proposal {
                delta,
                rationale: format!(
                    "Heuristic: {}.{} {} -> {}; {}",
                    step.section, step.key, current, next, step.why
                ),
                next_args: BenchArgs::new(),
            });
        }
        Err(ProposalError::Exhausted)
    }
}
