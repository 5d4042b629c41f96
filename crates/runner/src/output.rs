//! Parsing of `db_bench` style report lines.
//!
//! ```text
//! fillrandom   :       3.141 micros/op 318330 ops/sec 31.414 seconds 10000000 operations;   35.2 MB/s
//! ```

use serde::{Deserialize, Serialize};

/// Throughput numbers reported for one benchmark phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadMetrics {
    pub name: String,
    pub ops_per_sec: f64,
    pub micros_per_op: Option<f64>,
    pub mb_per_sec: Option<f64>,
}

/// Extract every phase line that carries an `ops/sec` figure.
pub fn parse_output(text: &str) -> Vec<WorkloadMetrics> {
    text.lines().filter_map(parse_line).collect()
}

/// Pick the phase the tuner optimizes: the one named after the requested
/// benchmark if present, otherwise the last reported phase.
pub fn primary<'a>(metrics: &'a [WorkloadMetrics], benchmark: &str) -> Option<&'a WorkloadMetrics> {
    metrics
        .iter()
        .rev()
        .find(|m| m.name == benchmark)
        .or_else(|| metrics.last())
}

fn parse_line(line: &str) -> Option<WorkloadMetrics> {
    let (name, rest) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }

    let tokens: Vec<&str> = rest
        .split(|c: char| c.is_whitespace() || c == ';')
        .filter(|t| !t.is_empty())
        .collect();
    let before = |unit: &str| -> Option<f64> {
        tokens
            .windows(2)
            .find(|pair| pair[1] == unit)
            .and_then(|pair| pair[0].parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    let ops_per_sec = before("ops/sec")?;
    Some(WorkloadMetrics {
        name: name.to_string(),
        ops_per_sec,
        micros_per_op: before("micros/op"),
        mb_per_sec: before("MB/s"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
RocksDB:    version 8.8.1
Keys:       16 bytes each (+ 0 bytes user-defined timestamp)
Entries:    1000000
------------------------------------------------
fillrandom   :       3.141 micros/op 318330 ops/sec 3.141 seconds 1000000 operations;   35.2 MB/s
readrandom   :       1.250 micros/op 800000 ops/sec 1.250 seconds 1000000 operations;   56.0 MB/s (1000000 of 1000000 found)
";

    #[test]
    fn test_parse_db_bench_report() {
        let metrics = parse_output(SAMPLE);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "fillrandom");
        assert_eq!(metrics[0].ops_per_sec, 318330.0);
        assert_eq!(metrics[0].micros_per_op, Some(3.141));
        assert_eq!(metrics[0].mb_per_sec, Some(35.2));
    }

    #[test]
    fn test_primary_prefers_named_benchmark() {
        let metrics = parse_output(SAMPLE);
        assert_eq!(primary(&metrics, "fillrandom").unwrap().ops_per_sec, 318330.0);
        assert_eq!(primary(&metrics, "tracefile").unwrap().name, "readrandom");
        assert!(primary(&[], "fillrandom").is_none());
    }

    #[test]
    fn test_lines_without_throughput_are_ignored() {
        assert!(parse_output("Keys:       16 bytes each\nDB path: [/tmp/db]\n").is_empty());
    }
}
