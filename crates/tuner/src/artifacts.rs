//! Persisted output of a tuning run.
//!
//! ```text
//! <output>/
//!   iteration_000/{options.ini, result.json, rationale.md, bench_args.json}
//!   iteration_001/...
//!   best_options.ini
//!   history.json
//!   delta_log.txt
//!   throughput.csv
//!   throughput.svg
//! ```

use crate::report::{sparkline, throughput_csv, trend_svg};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tuneforge_history::{History, HistoryEntry};
use tuneforge_options::format::render;

pub struct ArtifactWriter {
    root: PathBuf,
}

impl ArtifactWriter {
    /// Create the output directory if needed.
    pub fn create(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn iteration_dir(&self, iteration: u32) -> PathBuf {
        self.root.join(format!("iteration_{:03}", iteration))
    }

    /// Configuration, result, rationale and workload arguments of one
    /// committed iteration.
    pub fn write_iteration(&self, entry: &HistoryEntry) -> Result<PathBuf> {
        let dir = self.iteration_dir(entry.iteration);
        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

        write(&dir.join("options.ini"), render(&entry.configuration))?;
        write(&dir.join("result.json"), serde_json::to_string_pretty(&entry.result)?)?;
        write(&dir.join("bench_args.json"), serde_json::to_string_pretty(&entry.bench_args)?)?;

        let mut rationale = format!("# Iteration {}\n\n", entry.iteration);
        rationale.push_str(if entry.rationale.is_empty() {
            "(no rationale)"
        } else {
            entry.rationale.as_str()
        });
        rationale.push_str("\n\n## Changes\n\n");
        rationale.push_str(&entry.delta.to_string());
        rationale.push('\n');
        write(&dir.join("rationale.md"), rationale)?;
        Ok(dir)
    }

    /// Best configuration, full history, delta log and throughput trend.
    /// Rewritten after every commit.
    pub fn write_summary(&self, history: &History, test_name: &str) -> Result<()> {
        if let Some(best) = history.best() {
            write(&self.root.join("best_options.ini"), render(&best.configuration))?;
            debug!(
                iteration = best.iteration,
                ops_per_sec = best.result.ops_per_sec,
                "best configuration saved"
            );
        }
        history.save(self.root.join("history.json"))?;
        write(&self.root.join("delta_log.txt"), history.render_delta_log())?;
        write(&self.root.join("throughput.csv"), throughput_csv(history))?;
        write(
            &self.root.join("throughput.svg"),
            trend_svg(history, history.metric(), &format!("OpsPerSec {}", test_name)),
        )?;
        debug!(
            entries = history.len(),
            trend = %sparkline(history.series(history.metric())),
            output = %self.root.display(),
            "summary artifacts written"
        );
        Ok(())
    }
}

fn write(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuneforge_history::Metric;
    use tuneforge_options::format::parse_options;
    use tuneforge_options::seed::default_seed;
    use tuneforge_options::ConfigDiff;
    use tuneforge_runner::{BenchArgs, BenchmarkResult};

    #[test]
    fn test_iteration_and_final_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ArtifactWriter::create(dir.path().join("out")).unwrap();
        let config = default_seed().resolve().unwrap();
        let entry = HistoryEntry::new(
            0,
            config.clone(),
            BenchmarkResult::from_throughput(1000.0, 10.0, 20.0),
            "seed run",
            ConfigDiff::default(),
            BenchArgs::new().with("num", "100"),
        );

        let iter_dir = writer.write_iteration(&entry).unwrap();
        assert!(iter_dir.ends_with("iteration_000"));
        let saved = fs::read_to_string(iter_dir.join("options.ini")).unwrap();
        assert_eq!(parse_options(&saved).unwrap(), *config.as_config());
        assert!(fs::read_to_string(iter_dir.join("rationale.md")).unwrap().contains("seed run"));

        let mut history = History::new(Metric::OpsPerSec);
        history.append(entry).unwrap();
        writer.write_summary(&history, "fillrandom").unwrap();
        for name in ["best_options.ini", "history.json", "delta_log.txt", "throughput.csv", "throughput.svg"] {
            assert!(writer.root().join(name).exists(), "{} missing", name);
        }
    }
}
