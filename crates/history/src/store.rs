//! The history store.

use crate::entry::HistoryEntry;
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write;
use std::path::Path;
use thiserror::Error;
use tuneforge_options::{diff, ConfigDiff};

#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("iteration {attempted} appended after iteration {last}; history is append-only and ordered")]
    OutOfOrder { last: u32, attempted: u32 },

    #[error("history has no committed entries")]
    Empty,
}

/// Ordered, append-only log of committed iterations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    metric: Metric,
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            entries: Vec::new(),
        }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Append a committed iteration. Iteration indices must strictly increase.
    pub fn append(&mut self, entry: HistoryEntry) -> Result<(), HistoryError> {
        if let Some(last) = self.entries.last() {
            if entry.iteration <= last.iteration {
                return Err(HistoryError::OutOfOrder {
                    last: last.iteration,
                    attempted: entry.iteration,
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    /// Best entry by the store's metric; the earliest one wins ties.
    pub fn best(&self) -> Option<&HistoryEntry> {
        self.best_by(self.metric)
    }

    pub fn best_by(&self, metric: Metric) -> Option<&HistoryEntry> {
        let mut best: Option<(&HistoryEntry, f64)> = None;
        for entry in &self.entries {
            let value = metric.extract(entry);
            match best {
                Some((_, best_value)) if metric.compare(value, best_value) != Ordering::Greater => {}
                _ => best = Some((entry, value)),
            }
        }
        best.map(|(entry, _)| entry)
    }

    /// One value per entry in insertion order. Calling again restarts from
    /// the first entry.
    pub fn series(&self, metric: Metric) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(move |entry| metric.extract(entry))
    }

    /// Diffs between consecutive entries.
    pub fn to_delta_log(&self) -> Vec<ConfigDiff> {
        self.entries
            .windows(2)
            .map(|pair| diff(&pair[0].configuration, &pair[1].configuration))
            .collect()
    }

    /// Human-readable form of [`to_delta_log`](Self::to_delta_log).
    pub fn render_delta_log(&self) -> String {
        let mut out = String::new();
        for (pair, changes) in self.entries.windows(2).zip(self.to_delta_log()) {
            let (prev, next) = (&pair[0], &pair[1]);
            let _ = writeln!(
                out,
                "iteration {} -> {} ({}: {:.2} -> {:.2})",
                prev.iteration,
                next.iteration,
                self.metric.name(),
                self.metric.extract(prev),
                self.metric.extract(next)
            );
            for line in changes.to_string().lines() {
                let _ = writeln!(out, "  {}", line);
            }
        }
        out
    }

    /// Compact per-iteration view of the last `limit` entries, best marked
    /// with `*`.
    pub fn summary(&self, limit: usize) -> String {
        let best = self.best().map(|e| e.iteration);
        let mut out = String::new();
        for entry in self.recent(limit) {
            let marker = if Some(entry.iteration) == best { "*" } else { " " };
            let _ = write!(
                out,
                "{}iteration {}: {:.2} ops/sec, cpu {:.1}%, mem {:.1} MB",
                marker,
                entry.iteration,
                entry.result.ops_per_sec,
                entry.result.avg_cpu_percent,
                entry.result.avg_memory_mb
            );
            if entry.delta.is_empty() {
                out.push('\n');
            } else {
                let changes: Vec<String> = entry.delta.changes().iter().map(|c| c.to_string()).collect();
                let _ = writeln!(out, "; changed {}", changes.join(", "));
            }
        }
        out
    }

    /// Save to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file, re-checking ordering.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let stored: History = serde_json::from_str(&json)?;
        let mut history = History::new(stored.metric);
        for entry in stored.entries {
            history.append(entry)?;
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuneforge_options::seed::default_seed;
    use tuneforge_options::{ResolvedConfiguration, Section};
    use tuneforge_runner::{BenchArgs, BenchmarkResult};

    fn config_with_jobs(jobs: i64) -> ResolvedConfiguration {
        default_seed()
            .with(Section::DbOptions, "max_background_jobs", jobs)
            .resolve()
            .unwrap()
    }

    fn entry(iteration: u32, ops: f64) -> HistoryEntry {
        HistoryEntry::new(
            iteration,
            config_with_jobs(iteration as i64 + 1),
            BenchmarkResult::from_throughput(ops, 50.0, 256.0),
            format!("iteration {}", iteration),
            ConfigDiff::default(),
            BenchArgs::new(),
        )
    }

    fn history(throughputs: &[f64]) -> History {
        let mut history = History::new(Metric::OpsPerSec);
        for (idx, ops) in throughputs.iter().enumerate() {
            history.append(entry(idx as u32 + 1, *ops)).unwrap();
        }
        history
    }

    #[test]
    fn test_best_picks_maximum() {
        let history = history(&[100.0, 150.0, 120.0]);
        let best = history.best().unwrap();
        assert_eq!(best.result.ops_per_sec, 150.0);
        assert_eq!(best.iteration, 2);
    }

    #[test]
    fn test_best_tie_returns_first() {
        let history = history(&[150.0, 150.0, 100.0]);
        assert_eq!(history.best().unwrap().iteration, 1);
        assert!(History::new(Metric::OpsPerSec).best().is_none());
    }

    #[test]
    fn test_series_is_ordered_and_restartable() {
        let history = history(&[3.0, 1.0, 2.0, 5.0]);
        let first: Vec<f64> = history.series(Metric::OpsPerSec).collect();
        let second: Vec<f64> = history.series(Metric::OpsPerSec).collect();
        assert_eq!(first, vec![3.0, 1.0, 2.0, 5.0]);
        assert_eq!(first, second);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_append_rejects_out_of_order() {
        let mut history = history(&[1.0, 2.0]);
        let err = history.append(entry(2, 3.0)).unwrap_err();
        assert_eq!(err, HistoryError::OutOfOrder { last: 2, attempted: 2 });
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_delta_log_diffs_adjacent_entries() {
        let history = history(&[1.0, 2.0, 3.0]);
        let log = history.to_delta_log();
        assert_eq!(log.len(), 2);
        let change = log[0].get(Section::DbOptions, "max_background_jobs").unwrap();
        assert_eq!(change.old, Some(2i64.into()));
        assert_eq!(change.new, Some(3i64.into()));

        let rendered = history.render_delta_log();
        assert!(rendered.contains("iteration 1 -> 2"));
        assert!(rendered.contains("db_options.max_background_jobs: 2 -> 3"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let history = history(&[10.0, 20.0]);
        history.save(&path).unwrap();

        let loaded = History::load(&path).unwrap();
        assert_eq!(loaded.entries(), history.entries());
    }
}
