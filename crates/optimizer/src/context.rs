//! Host and trace descriptions for prompts.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Longest trace excerpt kept for prompts, in bytes.
pub const TRACE_EXCERPT_LIMIT: usize = 4096;

/// Summary of the machine the benchmark runs on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemContext {
    pub cpu_count: usize,
    pub cpu_model: Option<String>,
    pub total_memory_mb: Option<u64>,
    pub available_memory_mb: Option<u64>,
    /// Device and filesystem type backing the database path.
    pub storage: Option<String>,
    /// Output of a previous `fio` run against the storage device.
    pub fio_result: Option<String>,
}

impl SystemContext {
    /// Probe the current host. Missing `/proc` entries leave fields unset.
    pub fn probe(db_path: &Path, fio_result: Option<&Path>) -> Self {
        let cpuinfo = fs::read_to_string("/proc/cpuinfo").unwrap_or_default();
        let meminfo = fs::read_to_string("/proc/meminfo").unwrap_or_default();
        let mounts = fs::read_to_string("/proc/mounts").unwrap_or_default();

        let fio_result = fio_result.and_then(|path| match fs::read_to_string(path) {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read fio result");
                None
            }
        });

        Self {
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            cpu_model: cpu_model(&cpuinfo),
            total_memory_mb: meminfo_mb(&meminfo, "MemTotal"),
            available_memory_mb: meminfo_mb(&meminfo, "MemAvailable"),
            storage: storage_for(&mounts, db_path),
            fio_result,
        }
    }

    /// Multi-line description for prompts.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "- CPU: {} logical cores ({})",
            self.cpu_count,
            self.cpu_model.as_deref().unwrap_or("unknown model")
        );
        match (self.total_memory_mb, self.available_memory_mb) {
            (Some(total), Some(avail)) => {
                let _ = writeln!(out, "- Memory: {} MB total, {} MB available", total, avail);
            }
            (Some(total), None) => {
                let _ = writeln!(out, "- Memory: {} MB total", total);
            }
            _ => out.push_str("- Memory: unknown\n"),
        }
        let _ = writeln!(
            out,
            "- Storage: {}",
            self.storage.as_deref().unwrap_or("unknown")
        );
        if let Some(fio) = &self.fio_result {
            let _ = writeln!(out, "- fio result:\n{}", fio);
        }
        out
    }
}

fn cpu_model(cpuinfo: &str) -> Option<String> {
    cpuinfo
        .lines()
        .find(|line| line.starts_with("model name"))
        .and_then(|line| line.split_once(':'))
        .map(|(_, model)| model.trim().to_string())
}

/// A `/proc/meminfo` field in MiB (the file reports kB).
fn meminfo_mb(meminfo: &str, field: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix(field)?.strip_prefix(':')?;
        let kb: u64 = rest.split_whitespace().next()?.parse().ok()?;
        Some(kb / 1024)
    })
}

/// `device (fstype)` of the longest mount point containing `path`.
fn storage_for(mounts: &str, path: &Path) -> Option<String> {
    let path = resolve_path(path);
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            path.starts_with(mount_point)
                .then(|| (mount_point.len(), format!("{} ({}) at {}", device, fs_type, mount_point)))
        })
        .max_by_key(|(len, _)| *len)
        .map(|(_, desc)| desc)
}

/// Absolute form of `path` with its nearest existing ancestor canonicalized;
/// the database directory itself usually does not exist between runs.
fn resolve_path(path: &Path) -> PathBuf {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    for ancestor in path.ancestors() {
        if let Ok(canonical) = fs::canonicalize(ancestor) {
            let rest = path.strip_prefix(ancestor).unwrap_or(Path::new(""));
            return canonical.join(rest);
        }
    }
    path
}

/// Summary of a workload trace file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceContext {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Record count for text traces.
    pub records: Option<usize>,
    /// Leading token of each record and how often it occurs.
    pub operation_mix: BTreeMap<String, usize>,
    /// Start of the trace, cut at [`TRACE_EXCERPT_LIMIT`].
    pub excerpt: Option<String>,
}

impl TraceContext {
    /// Read and summarize a trace. Binary traces only report their size.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading trace {}", path.display()))?;
        let size_bytes = bytes.len() as u64;

        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(Self {
                path: path.to_path_buf(),
                size_bytes,
                records: None,
                operation_mix: BTreeMap::new(),
                excerpt: None,
            });
        };

        let mut operation_mix = BTreeMap::new();
        let mut records = 0;
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            records += 1;
            if let Some(op) = line.split(|c: char| c.is_whitespace() || c == ',').next() {
                *operation_mix.entry(op.to_string()).or_insert(0) += 1;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            records: Some(records),
            operation_mix,
            excerpt: Some(truncate(&text, TRACE_EXCERPT_LIMIT).to_string()),
        })
    }

    /// Multi-line description for prompts.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "- Trace: {} ({} bytes)", self.path.display(), self.size_bytes);
        match self.records {
            Some(records) => {
                let _ = writeln!(out, "- Records: {}", records);
            }
            None => out.push_str("- Binary trace, contents not summarized\n"),
        }
        if !self.operation_mix.is_empty() {
            let mut mix: Vec<(&String, &usize)> = self.operation_mix.iter().collect();
            mix.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            let top: Vec<String> = mix
                .iter()
                .take(10)
                .map(|(op, count)| format!("{}={}", op, count))
                .collect();
            let _ = writeln!(out, "- Operation mix: {}", top.join(", "));
        }
        if let Some(excerpt) = &self.excerpt {
            let _ = writeln!(out, "- Excerpt:\n{}", excerpt);
        }
        out
    }
}

/// `text` cut to at most `limit` bytes on a char boundary.
fn truncate(text: &str, limit: usize) -> &str {
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meminfo_and_cpuinfo_parsing() {
        let meminfo = "MemTotal:       16384000 kB\nMemFree:         1000 kB\nMemAvailable:    8192000 kB\n";
        assert_eq!(meminfo_mb(meminfo, "MemTotal"), Some(16000));
        assert_eq!(meminfo_mb(meminfo, "MemAvailable"), Some(8000));
        assert_eq!(meminfo_mb(meminfo, "SwapTotal"), None);

        let cpuinfo = "processor\t: 0\nmodel name\t: AMD EPYC 7B13\n";
        assert_eq!(cpu_model(cpuinfo).as_deref(), Some("AMD EPYC 7B13"));
    }

    #[test]
    fn test_storage_picks_longest_mount() {
        let mounts = "/dev/root / ext4 rw 0 0\n/dev/nvme0n1 /mnt/data xfs rw 0 0\n";
        let storage = storage_for(mounts, Path::new("/mnt/data/nonexistent/db")).unwrap();
        assert!(storage.starts_with("/dev/nvme0n1 (xfs)"), "{}", storage);
    }

    #[test]
    fn test_probe_reads_fio_result() {
        let dir = tempfile::tempdir().unwrap();
        let fio = dir.path().join("fio.txt");
        fs::write(&fio, "read: IOPS=120k\n").unwrap();

        let system = SystemContext::probe(&dir.path().join("db"), Some(&fio));
        assert!(system.cpu_count >= 1);
        assert_eq!(system.fio_result.as_deref(), Some("read: IOPS=120k"));
        assert!(system.describe().contains("IOPS=120k"));
    }

    #[test]
    fn test_trace_summary_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        let mut text = String::new();
        for i in 0..2000 {
            let op = if i % 4 == 0 { "Put" } else { "Get" };
            text.push_str(&format!("{} key{:06}\n", op, i));
        }
        fs::write(&path, &text).unwrap();

        let trace = TraceContext::load(&path).unwrap();
        assert_eq!(trace.records, Some(2000));
        assert_eq!(trace.operation_mix["Get"], 1500);
        assert_eq!(trace.operation_mix["Put"], 500);
        assert!(trace.excerpt.as_ref().unwrap().len() <= TRACE_EXCERPT_LIMIT);
        assert!(trace.describe().contains("Get=1500, Put=500"));
    }

    #[test]
    fn test_missing_trace_is_error() {
        assert!(TraceContext::load("/nonexistent/trace").is_err());
    }
}
