//! Key-level comparison of two configurations.

use crate::config::Configuration;
use crate::section::Section;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One changed key. `old`/`new` are `None` when the key is absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyChange {
    pub section: Section,
    pub key: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl fmt::Display for KeyChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |value: &Option<Value>| {
            value
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "<unset>".into())
        };
        write!(
            f,
            "{}.{}: {} -> {}",
            self.section,
            self.key,
            show(&self.old),
            show(&self.new)
        )
    }
}

/// Set of changed keys between two configurations, in canonical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDiff {
    changes: Vec<KeyChange>,
}

impl ConfigDiff {
    pub fn changes(&self) -> &[KeyChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, section: Section, key: &str) -> Option<&KeyChange> {
        self.changes
            .iter()
            .find(|change| change.section == section && change.key == key)
    }
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.changes.is_empty() {
            return f.write_str("(no changes)");
        }
        for (idx, change) in self.changes.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", change)?;
        }
        Ok(())
    }
}

/// Keys whose values differ between `a` and `b`, compared with normalized
/// value equality (`4` and `4.0` are the same setting).
pub fn diff(a: &Configuration, b: &Configuration) -> ConfigDiff {
    let keys: BTreeSet<(Section, &str)> = a
        .iter()
        .chain(b.iter())
        .map(|(section, key, _)| (section, key))
        .collect();

    let changes = keys
        .into_iter()
        .filter_map(|(section, key)| {
            let old = a.get(section, key);
            let new = b.get(section, key);
            if old == new {
                None
            } else {
                Some(KeyChange {
                    section,
                    key: key.to_string(),
                    old: old.cloned(),
                    new: new.cloned(),
                })
            }
        })
        .collect();

    ConfigDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_compares_numbers_numerically() {
        let a = Configuration::new()
            .with(Section::CfOptions, "max_bytes_for_level_multiplier", Value::Int(10))
            .with(Section::DbOptions, "max_background_jobs", 2i64);
        let b = Configuration::new()
            .with(Section::CfOptions, "max_bytes_for_level_multiplier", Value::Float(10.0))
            .with(Section::DbOptions, "max_background_jobs", 4i64);

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 1);
        let change = changes.get(Section::DbOptions, "max_background_jobs").unwrap();
        assert_eq!(change.old, Some(Value::Int(2)));
        assert_eq!(change.new, Some(Value::Int(4)));
    }

    #[test]
    fn test_diff_reports_added_and_removed_keys() {
        let a = Configuration::new().with(Section::DbOptions, "use_fsync", false);
        let b = Configuration::new().with(Section::TableOptions, "block_size", 16384i64);

        let changes = diff(&a, &b);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get(Section::DbOptions, "use_fsync").unwrap().new, None);
        assert_eq!(changes.get(Section::TableOptions, "block_size").unwrap().old, None);
        assert!(diff(&a, &a).is_empty());
    }
}
