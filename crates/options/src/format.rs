//! Options file layout.
//!
//! Section headers in brackets, one `key=value` per line, sections in
//! canonical order and keys sorted. `#` starts a comment line.
//!
//! ```text
//! [Version]
//!   options_file_version=1.1
//!   rocksdb_version=8.8.1
//!
//! [DBOptions]
//!   max_background_jobs=4
//! ```

use crate::config::{Configuration, Settings};
use crate::error::{SchemaError, SchemaIssue};
use crate::schema::Schema;
use crate::section::Section;
use std::fmt::Write;

/// Render every section, including the benchmark flags.
pub fn render(config: &Configuration) -> String {
    render_sections(config, |_| true)
}

/// Render only the sections the storage engine reads from its options file.
pub fn render_options_file(config: &Configuration) -> String {
    render_sections(config, Section::is_engine_section)
}

fn render_sections(config: &Configuration, include: impl Fn(&Section) -> bool) -> String {
    let mut out = String::new();
    for section in Section::ALL.iter().filter(|s| include(s)) {
        let Some(keys) = config.section(*section) else {
            continue;
        };
        if keys.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "[{}]", section.header());
        for (key, value) in keys {
            let _ = writeln!(out, "  {}={}", key, value);
        }
    }
    out
}

/// Parse options text into a configuration, typing each value through the
/// schema. Keys unknown to the schema are kept as text and surface later as
/// validation issues.
pub fn parse_options(text: &str) -> Result<Configuration, SchemaError> {
    let schema = Schema::rocksdb();
    let mut settings = Settings::new();
    let mut current: Option<Section> = None;
    let mut issues = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            if !line.ends_with(']') {
                return Err(syntax(line_no, "unterminated section header"));
            }
            current = Some(Section::parse(line).ok_or_else(|| {
                syntax(line_no, &format!("unknown section {}", line))
            })?);
            continue;
        }

        let section = current.ok_or_else(|| syntax(line_no, "key outside of any section"))?;
        let (key, raw) = line
            .split_once('=')
            .ok_or_else(|| syntax(line_no, "expected key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax(line_no, "empty key"));
        }

        let keys = settings.entry(section).or_default();
        if keys.contains_key(key) {
            return Err(syntax(line_no, &format!("duplicate key {}", key)));
        }
        match schema.parse_value(section, key, raw) {
            Ok(value) => {
                keys.insert(key.to_string(), value);
            }
            Err(issue) => issues.push(SchemaIssue {
                section,
                key: key.to_string(),
                issue,
            }),
        }
    }

    if issues.is_empty() {
        Ok(Configuration::from_settings(settings))
    } else {
        Err(SchemaError::Invalid(issues))
    }
}

fn syntax(line: usize, message: &str) -> SchemaError {
    SchemaError::Syntax {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssueKind;
    use crate::seed::default_seed;
    use crate::value::Value;

    #[test]
    fn test_render_parse_round_trip() {
        let seed = default_seed();
        let text = render(&seed);
        let parsed = parse_options(&text).unwrap();
        assert_eq!(parsed, seed);
        assert_eq!(render(&parsed), text);
    }

    #[test]
    fn test_options_file_omits_bench_section() {
        let text = render_options_file(&default_seed());
        assert!(!text.contains("DBBenchOptions"));
        assert!(text.contains("[DBOptions]"));
        assert!(text.contains("[CFOptions \"default\"]"));
        assert!(text.contains("[TableOptions/BlockBasedTable \"default\"]"));
    }

    #[test]
    fn test_parse_types_values() {
        let text = "# generated\n[DBOptions]\n  max_background_jobs=4\n  use_fsync=false\n[CFOptions \"default\"]\n  max_bytes_for_level_multiplier=10.000000\n";
        let config = parse_options(text).unwrap();
        assert_eq!(config.get(Section::DbOptions, "max_background_jobs"), Some(&Value::Int(4)));
        assert_eq!(config.get(Section::DbOptions, "use_fsync"), Some(&Value::Bool(false)));
        assert_eq!(
            config.get(Section::CfOptions, "max_bytes_for_level_multiplier"),
            Some(&Value::Float(10.0))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_options("max_background_jobs=4"),
            Err(SchemaError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse_options("[Mystery]\nx=1"),
            Err(SchemaError::Syntax { .. })
        ));
        assert!(matches!(
            parse_options("[DBOptions]\nmax_open_files=4\nmax_open_files=5"),
            Err(SchemaError::Syntax { line: 3, .. })
        ));

        let err = parse_options("[DBOptions]\n  max_open_files=many\n").unwrap_err();
        assert!(matches!(err.issues()[0].issue, IssueKind::Unparsable { .. }));
    }
}
