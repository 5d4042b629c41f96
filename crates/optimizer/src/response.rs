//! Parsing of reasoning service answers.
//!
//! The expected answer is a JSON object, optionally wrapped in a markdown
//! code fence:
//!
//! ```text
//! {
//!   "options": { "cf_options": { "write_buffer_size": 134217728 } },
//!   "bench_args": { "num": "1000000" },
//!   "reasoning": "..."
//! }
//! ```

use crate::error::ProposalError;
use crate::proposer::Proposal;
use serde::Deserialize;
use std::collections::BTreeMap;
use tuneforge_options::{IssueKind, PartialConfiguration, Schema, SchemaError, SchemaIssue, Section};
use tuneforge_runner::BenchArgs;

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    options: BTreeMap<String, BTreeMap<String, serde_json::Value>>,
    #[serde(default, alias = "db_bench_args")]
    bench_args: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    reasoning: String,
}

/// Turn message content into a proposal. Every value is read through the
/// schema, so a proposal that comes back is already type-checked.
pub fn parse_response(content: &str, schema: &Schema) -> Result<Proposal, ProposalError> {
    let json = extract_json(content)
        .ok_or_else(|| ProposalError::Malformed("no JSON object in response".into()))?;
    let raw: RawResponse =
        serde_json::from_str(json).map_err(|e| ProposalError::Malformed(e.to_string()))?;

    let mut delta = PartialConfiguration::new();
    let mut issues = Vec::new();
    for (section_name, keys) in &raw.options {
        let section = Section::parse(section_name)
            .ok_or_else(|| ProposalError::Malformed(format!("unknown section '{}'", section_name)))?;
        for (key, value) in keys {
            let text = raw_text(value)
                .ok_or_else(|| ProposalError::Malformed(format!("{}.{} is not a scalar", section, key)))?;
            let parsed = match schema.lookup(section, key) {
                Some(spec) => spec.kind.parse(&text),
                None => Err(IssueKind::UnknownKey),
            };
            match parsed {
                Ok(value) => delta.set(section, key.as_str(), value),
                Err(issue) => issues.push(SchemaIssue {
                    section,
                    key: key.clone(),
                    issue,
                }),
            }
        }
    }
    if !issues.is_empty() {
        return Err(SchemaError::Invalid(issues).into());
    }
    if delta.is_empty() {
        return Err(ProposalError::EmptyDelta);
    }

    let mut next_args = BenchArgs::new();
    for (key, value) in &raw.bench_args {
        let text = raw_text(value)
            .ok_or_else(|| ProposalError::Malformed(format!("bench arg '{}' is not a scalar", key)))?;
        next_args.set(key.trim_start_matches("--"), text);
    }

    Ok(Proposal {
        delta,
        rationale: raw.reasoning.trim().to_string(),
        next_args,
    })
}

/// The JSON object inside `content`: the body of the first code fence if
/// there is one, else the span from the first `{` to the last `}`.
fn extract_json(content: &str) -> Option<&str> {
    let body = match content.find("```") {
        Some(open) => {
            let after = &content[open + 3..];
            // Skip the info string (`json`) on the fence line.
            let start = after.find('\n').map(|i| i + 1).unwrap_or(0);
            let after = &after[start..];
            match after.find("```") {
                Some(close) => &after[..close],
                None => after,
            }
        }
        None => content,
    };
    let first = body.find('{')?;
    let last = body.rfind('}')?;
    (first < last).then(|| &body[first..=last])
}

/// Options-file text for a JSON scalar. Whole floats become integers so
/// `8.0` is accepted for an integer key.
fn raw_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f.fract() == 0.0 && f.abs() < 9.0e15 {
                    Some(format!("{}", f as i64))
                } else {
                    Some(f.to_string())
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tuneforge_options::Value;

    fn parse(content: &str) -> Result<Proposal, ProposalError> {
        parse_response(content, Schema::rocksdb())
    }

    #[test]
    fn test_fenced_json_is_parsed() {
        let content = r#"Here is my suggestion:
```json
{
  "options": {
    "db_options": {"max_background_jobs": 8},
    "cf_options": {"compression": "kLZ4Compression", "write_buffer_size": 134217728.0}
  },
  "bench_args": {"num": 2000000},
  "reasoning": "More background jobs for compaction."
}
```
"#;
        let proposal = parse(content).unwrap();
        assert_eq!(proposal.delta.len(), 3);
        assert_eq!(
            proposal.delta.get(Section::DbOptions, "max_background_jobs"),
            Some(&Value::Int(8))
        );
        assert_eq!(
            proposal.delta.get(Section::CfOptions, "write_buffer_size"),
            Some(&Value::Int(134217728))
        );
        assert_eq!(proposal.next_args.get("num"), Some("2000000"));
        assert_eq!(proposal.rationale, "More background jobs for compaction.");
    }

    #[test]
    fn test_bare_json_and_header_section_names() {
        let content = r#"{"options": {"TableOptions/BlockBasedTable \"default\"": {"block_size": "16384"}}}"#;
        let proposal = parse(content).unwrap();
        assert_eq!(
            proposal.delta.get(Section::TableOptions, "block_size"),
            Some(&Value::Int(16384))
        );
        assert!(proposal.next_args.is_empty());
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(parse("I cannot help with that."), Err(ProposalError::Malformed(_))));
        assert!(matches!(parse("{ not json }"), Err(ProposalError::Malformed(_))));
        assert!(matches!(
            parse(r#"{"options": {"mystery": {"a": 1}}}"#),
            Err(ProposalError::Malformed(_))
        ));
    }

    #[test]
    fn test_empty_delta_is_rejected() {
        assert!(matches!(parse(r#"{"options": {}, "reasoning": "keep"}"#), Err(ProposalError::EmptyDelta)));
        assert!(matches!(parse(r#"{"reasoning": "nothing"}"#), Err(ProposalError::EmptyDelta)));
    }

    #[test]
    fn test_schema_invalid_delta_is_rejected() {
        let err = parse(r#"{"options": {"db_options": {"max_background_jobs": "many"}}}"#).unwrap_err();
        match err {
            ProposalError::InvalidDelta(e) => {
                assert_eq!(e.issues()[0].key, "max_background_jobs");
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = parse(r#"{"options": {"cf_options": {"compression": "kBrotli"}}}"#).unwrap_err();
        assert!(matches!(err, ProposalError::InvalidDelta(_)));

        let err = parse(r#"{"options": {"db_options": {"turbo_mode": true}}}"#).unwrap_err();
        assert!(matches!(err, ProposalError::InvalidDelta(_)));
    }
}
