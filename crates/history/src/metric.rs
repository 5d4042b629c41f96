//! Metric selectors over history entries.

use crate::entry::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A numeric view of an entry, used for ranking and plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    OpsPerSec,
    MicrosPerOp,
    MbPerSec,
    AvgCpuPercent,
    AvgMemoryMb,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::OpsPerSec => "ops_per_sec",
            Metric::MicrosPerOp => "micros_per_op",
            Metric::MbPerSec => "mb_per_sec",
            Metric::AvgCpuPercent => "avg_cpu_percent",
            Metric::AvgMemoryMb => "avg_memory_mb",
        }
    }

    /// Value for one entry. Missing optional metrics read as `NaN`.
    pub fn extract(&self, entry: &HistoryEntry) -> f64 {
        let result = &entry.result;
        match self {
            Metric::OpsPerSec => result.ops_per_sec,
            Metric::MicrosPerOp => result.micros_per_op.unwrap_or(f64::NAN),
            Metric::MbPerSec => result.mb_per_sec.unwrap_or(f64::NAN),
            Metric::AvgCpuPercent => result.avg_cpu_percent,
            Metric::AvgMemoryMb => result.avg_memory_mb,
        }
    }

    /// Whether a larger value is better.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::MicrosPerOp | Metric::AvgCpuPercent | Metric::AvgMemoryMb)
    }

    /// Total order from worst to best. `NaN` ranks below every number.
    pub fn compare(&self, a: f64, b: f64) -> Ordering {
        match (a.is_nan(), b.is_nan()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) if self.higher_is_better() => a.total_cmp(&b),
            (false, false) => b.total_cmp(&a),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_orders_by_direction() {
        assert_eq!(Metric::OpsPerSec.compare(2.0, 1.0), Ordering::Greater);
        assert_eq!(Metric::MicrosPerOp.compare(2.0, 1.0), Ordering::Less);
        assert_eq!(Metric::MicrosPerOp.compare(f64::NAN, 100.0), Ordering::Less);
    }
}
