//! Workload arguments passed to the benchmark executable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered `key → value` flags, rendered as `--key=value`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenchArgs {
    flags: BTreeMap<String, String>,
}

impl BenchArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` pairs; a leading `--` on the key is stripped.
    pub fn parse<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, String> {
        let mut args = Self::new();
        for pair in pairs {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
            let key = key.trim().trim_start_matches("--");
            if key.is_empty() {
                return Err(format!("empty key in '{}'", pair));
            }
            args.set(key, value.trim());
        }
        Ok(args)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.flags.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.flags.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.flags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `overrides`; their values win on collision.
    pub fn merge(&mut self, overrides: &BenchArgs) {
        for (key, value) in overrides.iter() {
            self.set(key, value);
        }
    }

    pub fn to_flags(&self) -> Vec<String> {
        self.flags
            .iter()
            .map(|(key, value)| format!("--{}={}", key, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let args = BenchArgs::parse(["--num=1000000", "threads=4"]).unwrap();
        assert_eq!(args.get("num"), Some("1000000"));
        assert_eq!(args.to_flags(), vec!["--num=1000000", "--threads=4"]);
        assert!(BenchArgs::parse(["threads"]).is_err());
        assert!(BenchArgs::parse(["=4"]).is_err());
    }

    #[test]
    fn test_merge_overrides_win() {
        let mut base = BenchArgs::new().with("num", "1000").with("threads", "1");
        base.merge(&BenchArgs::new().with("threads", "8").with("value_size", "400"));
        assert_eq!(base.get("num"), Some("1000"));
        assert_eq!(base.get("threads"), Some("8"));
        assert_eq!(base.get("value_size"), Some("400"));
    }
}
