//! Append-only record of committed tuning iterations.
//!
//! Only successful runs are recorded. Entries are ordered by iteration
//! index, never reordered, and only handed out by shared reference.

pub mod entry;
pub mod metric;
pub mod store;

pub use entry::HistoryEntry;
pub use metric::Metric;
pub use store::{History, HistoryError};
