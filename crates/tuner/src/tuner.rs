//! The tuning control loop.

use crate::artifacts::ArtifactWriter;
use crate::config::{MergeBase, TunerConfig};
use crate::context::{LoopContext, LoopState};
use crate::error::{AttemptError, StartupError, TuneError};
use crate::retry::attempt;
use std::fs;
use tracing::{error, info, warn};
use tuneforge_history::{HistoryEntry, HistoryError};
use tuneforge_optimizer::{ProposalContext, ProposalError, Proposer, SystemContext, TraceContext};
use tuneforge_options::format::parse_options;
use tuneforge_options::seed::default_seed;
use tuneforge_options::{diff, merge, ConfigDiff, ResolvedConfiguration};
use tuneforge_runner::BenchmarkRunner;

const SEED_RATIONALE: &str = "Seed configuration";

/// Drives seed run and proposal iterations for one benchmark runner and one
/// proposer.
pub struct Tuner<R, P> {
    config: TunerConfig,
    runner: R,
    proposer: P,
    system: SystemContext,
    trace: Option<TraceContext>,
    artifacts: ArtifactWriter,
}

impl<R: BenchmarkRunner, P: Proposer> Tuner<R, P> {
    /// Validate startup arguments and prepare the output directory. Nothing
    /// is benchmarked here.
    pub fn new(
        config: TunerConfig,
        runner: R,
        proposer: P,
        system: SystemContext,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let trace = match &config.trace {
            Some(path) => Some(TraceContext::load(path).map_err(|source| StartupError::Trace {
                path: path.clone(),
                source,
            })?),
            None => None,
        };

        let artifacts = ArtifactWriter::create(&config.output_dir).map_err(|source| {
            StartupError::Output {
                path: config.output_dir.clone(),
                source,
            }
        })?;

        info!(
            runner = runner.name(),
            proposer = proposer.name(),
            iterations = config.iterations,
            max_attempts = config.retry.max_attempts,
            test_name = %config.test_name,
            trace = trace.is_some(),
            "tuner ready"
        );
        Ok(Self {
            config,
            runner,
            proposer,
            system,
            trace,
            artifacts,
        })
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn proposer(&self) -> &P {
        &self.proposer
    }

    /// A fresh context for [`run`](Self::run).
    pub fn context(&self) -> LoopContext {
        LoopContext::new(self.config.metric, self.config.bench_args.clone())
    }

    /// Run the seed and every iteration. Ends in `Done` or `Failed`.
    ///
    /// Summary artifacts are rewritten after every committed iteration, so
    /// a failed or interrupted run keeps everything committed so far.
    pub fn run(&mut self, ctx: &mut LoopContext) -> Result<(), TuneError> {
        let outcome = self.drive(ctx);
        match &outcome {
            Ok(()) => {
                ctx.transition(LoopState::Done);
                if let Some(best) = ctx.history().best() {
                    info!(
                        iteration = best.iteration,
                        ops_per_sec = best.result.ops_per_sec,
                        output = %self.artifacts.root().display(),
                        "tuning finished"
                    );
                }
            }
            Err(e) => {
                error!(error = %e, exit_code = e.exit_code(), "tuning failed");
                ctx.transition(LoopState::Failed);
            }
        }
        outcome
    }

    fn drive(&mut self, ctx: &mut LoopContext) -> Result<(), TuneError> {
        let seed = self.load_seed()?;
        self.run_seed(ctx, seed)?;
        for iteration in 1..=self.config.iterations {
            ctx.transition(LoopState::Running(iteration));
            self.iterate(ctx, iteration)?;
        }
        Ok(())
    }

    fn load_seed(&self) -> Result<ResolvedConfiguration, TuneError> {
        let config = match &self.config.seed {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|source| StartupError::Seed {
                    path: path.clone(),
                    source,
                })?;
                info!(path = %path.display(), "loaded seed options");
                parse_options(&text)?
            }
            None => default_seed(),
        };
        Ok(config.resolve()?)
    }

    fn run_seed(&mut self, ctx: &mut LoopContext, seed: ResolvedConfiguration) -> Result<(), TuneError> {
        info!("benchmarking seed configuration");
        ctx.record_attempts(1);
        let args = ctx.bench_args().clone();
        let result = self
            .runner
            .run(&seed, &args, "iteration_000")
            .map_err(|e| {
                error!(iteration = 0, kind = e.kind(), error = %e, "seed run failed");
                TuneError::SeedFailed(e)
            })?;

        let recorded_trace = result.trace_path.clone();
        let entry = HistoryEntry::new(0, seed, result, SEED_RATIONALE, ConfigDiff::default(), args);
        self.commit(ctx, entry)?;

        // The seed's own trace describes the workload actually run; later
        // proposals see it instead of the startup trace.
        if let Some(path) = recorded_trace {
            match TraceContext::load(&path) {
                Ok(trace) => {
                    info!(path = %path.display(), records = trace.records, "using trace recorded by seed run");
                    self.trace = Some(trace);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "cannot read trace recorded by seed run"),
            }
        }
        Ok(())
    }

    fn iterate(&mut self, ctx: &mut LoopContext, iteration: u32) -> Result<(), TuneError> {
        let base = match self.config.merge_base {
            MergeBase::Latest => ctx.history().last(),
            MergeBase::Best => ctx.history().best(),
        }
        .map(|entry| entry.configuration.clone())
        .ok_or(HistoryError::Empty)?;

        let runner = &mut self.runner;
        let proposer = &self.proposer;
        let system = &self.system;
        let trace = self.trace.as_ref();
        let policy = self.config.retry;
        let test_name = self.config.test_name.as_str();
        let mut attempts_made = 0;

        let outcome = attempt(&policy, |step| {
            attempts_made += 1;
            let proposal_ctx = ProposalContext {
                history: ctx.history(),
                current: &base,
                system,
                trace,
                bench_args: ctx.bench_args(),
                usage: ctx.usage().latest(),
                test_name,
                attempt: step.number,
            };
            let result = (|| {
                let proposal = proposer.propose(&proposal_ctx, step.temperature)?;
                let resolved = merge(&base, &proposal.delta)
                    .and_then(|merged| merged.resolve())
                    .map_err(ProposalError::InvalidDelta)?;

                let mut args = ctx.bench_args().clone();
                args.merge(&proposal.next_args);
                let label = format!("iteration_{:03}_attempt_{}", iteration, step.number);
                let result = runner.run(&resolved, &args, &label)?;
                Ok::<_, AttemptError>((proposal, resolved, args, result))
            })();

            if let Err(e) = &result {
                warn!(
                    iteration,
                    attempt = step.number,
                    remaining = step.remaining,
                    temperature = step.temperature,
                    kind = e.kind(),
                    error = %e,
                    "attempt failed"
                );
            }
            result
        });
        ctx.record_attempts(attempts_made);

        let (proposal, resolved, args, result) = outcome.map_err(|exhausted| {
            error!(
                iteration,
                attempts = exhausted.attempts,
                max_attempts = policy.max_attempts,
                "retry budget exhausted"
            );
            TuneError::Exhausted {
                iteration,
                attempts: exhausted.attempts,
                last_error: exhausted.last_error,
            }
        })?;

        let previous = ctx
            .history()
            .last()
            .map(|entry| diff(&entry.configuration, &resolved))
            .unwrap_or_default();
        let entry = HistoryEntry::new(iteration, resolved, result, proposal.rationale, previous, args);
        self.commit(ctx, entry)
    }

    fn commit(&mut self, ctx: &mut LoopContext, entry: HistoryEntry) -> Result<(), TuneError> {
        let iteration = entry.iteration;
        let ops_per_sec = entry.result.ops_per_sec;
        let changed = entry.delta.len();
        let dir = self.artifacts.write_iteration(&entry)?;
        ctx.commit(entry)?;
        self.artifacts.write_summary(ctx.history(), &self.config.test_name)?;

        let best = ctx.history().best().map(|b| b.iteration);
        info!(
            iteration,
            ops_per_sec,
            changed_keys = changed,
            best_iteration = best,
            artifacts = %dir.display(),
            "iteration committed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuneforge_optimizer::HeuristicProposer;
    use tuneforge_runner::{BenchArgs, BenchmarkFailure, BenchmarkResult};

    struct CountingRunner {
        runs: usize,
    }

    impl BenchmarkRunner for CountingRunner {
        fn name(&self) -> &str {
            "counting"
        }

        fn run(
            &mut self,
            _config: &ResolvedConfiguration,
            _args: &BenchArgs,
            _label: &str,
        ) -> Result<BenchmarkResult, BenchmarkFailure> {
            self.runs += 1;
            Ok(BenchmarkResult::from_throughput(1000.0, 10.0, 10.0))
        }
    }

    #[test]
    fn test_iteration_without_seed_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunerConfig {
            output_dir: dir.path().to_path_buf(),
            ..TunerConfig::default()
        };
        let mut tuner = Tuner::new(config, CountingRunner { runs: 0 }, HeuristicProposer, SystemContext::default())
            .unwrap();
        let mut ctx = tuner.context();

        let err = tuner.iterate(&mut ctx, 1).unwrap_err();
        assert!(matches!(err, TuneError::History(HistoryError::Empty)));
        assert_eq!(err.exit_code(), 5);
        assert_eq!(tuner.runner().runs, 0);
    }

    #[test]
    fn test_summary_is_refreshed_after_each_commit() {
        let dir = tempfile::tempdir().unwrap();
        let config = TunerConfig {
            output_dir: dir.path().to_path_buf(),
            iterations: 1,
            ..TunerConfig::default()
        };
        let mut tuner = Tuner::new(config, CountingRunner { runs: 0 }, HeuristicProposer, SystemContext::default())
            .unwrap();
        let mut ctx = tuner.context();

        let seed = tuner.load_seed().unwrap();
        tuner.run_seed(&mut ctx, seed).unwrap();
        let history = fs::read_to_string(dir.path().join("history.json")).unwrap();
        assert!(history.contains("\"iteration\": 0"));
        assert!(dir.path().join("throughput.svg").exists());

        tuner.iterate(&mut ctx, 1).unwrap();
        let history = fs::read_to_string(dir.path().join("history.json")).unwrap();
        assert!(history.contains("\"iteration\": 1"));
        assert_eq!(fs::read_to_string(dir.path().join("throughput.csv")).unwrap().lines().count(), 3);
    }
}
