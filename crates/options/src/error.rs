//! Schema validation errors.

use crate::section::Section;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// What is wrong with a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    MissingRequired,
    WrongType { expected: String, found: String },
    NotInEnum { value: String, allowed: Vec<String> },
    UnknownKey,
    Unparsable { raw: String, expected: String },
}

/// One offending key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub section: Section,
    pub key: String,
    pub issue: IssueKind,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: ", self.section, self.key)?;
        match &self.issue {
            IssueKind::MissingRequired => f.write_str("missing required key"),
            IssueKind::WrongType { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            IssueKind::NotInEnum { value, allowed } => {
                write!(f, "'{}' not one of [{}]", value, allowed.join(", "))
            }
            IssueKind::UnknownKey => f.write_str("unknown key"),
            IssueKind::Unparsable { raw, expected } => {
                write!(f, "cannot read '{}' as {}", raw, expected)
            }
        }
    }
}

/// Validation failure listing every offending key.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("configuration failed schema validation: {}", render_issues(.0))]
    Invalid(Vec<SchemaIssue>),

    #[error("malformed options text at line {line}: {message}")]
    Syntax { line: usize, message: String },
}

impl SchemaError {
    /// Offending keys, empty for syntax errors.
    pub fn issues(&self) -> &[SchemaIssue] {
        match self {
            SchemaError::Invalid(issues) => issues,
            SchemaError::Syntax { .. } => &[],
        }
    }
}

fn render_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_lists_offending_keys() {
        let err = SchemaError::Invalid(vec![
            SchemaIssue {
                section: Section::DbOptions,
                key: "max_open_files".into(),
                issue: IssueKind::MissingRequired,
            },
            SchemaIssue {
                section: Section::CfOptions,
                key: "compression".into(),
                issue: IssueKind::NotInEnum {
                    value: "kGzip".into(),
                    allowed: vec!["kNoCompression".into()],
                },
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("db_options.max_open_files: missing required key"));
        assert!(message.contains("'kGzip' not one of"));
        assert_eq!(err.issues().len(), 2);
    }
}
