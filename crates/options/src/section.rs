//! Configuration sections and their options-file headers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named group of settings.
///
/// `DbBench` holds flags for the benchmark executable itself; the remaining
/// sections are written to the engine's options file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    DbBench,
    Version,
    DbOptions,
    CfOptions,
    TableOptions,
}

impl Section {
    /// Canonical order used when rendering.
    pub const ALL: [Section; 5] = [
        Section::DbBench,
        Section::Version,
        Section::DbOptions,
        Section::CfOptions,
        Section::TableOptions,
    ];

    /// Short identifier (matches the serde name).
    pub fn name(&self) -> &'static str {
        match self {
            Section::DbBench => "db_bench",
            Section::Version => "version",
            Section::DbOptions => "db_options",
            Section::CfOptions => "cf_options",
            Section::TableOptions => "table_options",
        }
    }

    /// Header line contents as written in an options file, without brackets.
    pub fn header(&self) -> &'static str {
        match self {
            Section::DbBench => "DBBenchOptions",
            Section::Version => "Version",
            Section::DbOptions => "DBOptions",
            Section::CfOptions => "CFOptions \"default\"",
            Section::TableOptions => "TableOptions/BlockBasedTable \"default\"",
        }
    }

    /// Whether this section belongs in the engine's options file.
    pub fn is_engine_section(&self) -> bool {
        !matches!(self, Section::DbBench)
    }

    /// Resolve either an options-file header or a short identifier.
    ///
    /// Column family names in headers (`CFOptions "default"`) are ignored.
    pub fn parse(raw: &str) -> Option<Section> {
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        let head = trimmed
            .split(|c: char| c.is_whitespace() || c == '"')
            .next()
            .unwrap_or("");

        match head.to_ascii_lowercase().as_str() {
            "dbbenchoptions" | "db_bench" | "db_bench_options" => Some(Section::DbBench),
            "version" => Some(Section::Version),
            "dboptions" | "db_options" => Some(Section::DbOptions),
            "cfoptions" | "cf_options" => Some(Section::CfOptions),
            "tableoptions/blockbasedtable" | "tableoptions" | "table_options" => {
                Some(Section::TableOptions)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headers_and_names() {
        for section in Section::ALL {
            assert_eq!(Section::parse(section.header()), Some(section));
            assert_eq!(Section::parse(section.name()), Some(section));
        }
        assert_eq!(Section::parse("[CFOptions \"users\"]"), Some(Section::CfOptions));
        assert_eq!(Section::parse("TableOptions/PlainTable"), None);
    }
}
