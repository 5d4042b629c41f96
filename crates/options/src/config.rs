//! Configuration containers and merging.

use crate::error::SchemaError;
use crate::schema::Schema;
use crate::section::Section;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Deref;

/// Section → key → value.
pub type Settings = BTreeMap<Section, BTreeMap<String, Value>>;

/// A set of settings that may or may not cover every required key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    settings: Settings,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn get(&self, section: Section, key: &str) -> Option<&Value> {
        self.settings.get(&section).and_then(|keys| keys.get(key))
    }

    pub fn set(&mut self, section: Section, key: impl Into<String>, value: impl Into<Value>) {
        self.settings
            .entry(section)
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn with(mut self, section: Section, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(section, key, value);
        self
    }

    pub fn section(&self, section: Section) -> Option<&BTreeMap<String, Value>> {
        self.settings.get(&section)
    }

    /// Number of keys across all sections.
    pub fn len(&self) -> usize {
        self.settings.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every `(section, key, value)` in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &str, &Value)> {
        self.settings.iter().flat_map(|(section, keys)| {
            keys.iter()
                .map(move |(key, value)| (*section, key.as_str(), value))
        })
    }

    /// Validate against the full schema and promote to a resolved
    /// configuration.
    pub fn resolve(self) -> Result<ResolvedConfiguration, SchemaError> {
        Schema::rocksdb().validate(&self.settings)?;
        Ok(ResolvedConfiguration { inner: self })
    }

    /// `db_bench` section rendered as `--key=value` command line flags.
    pub fn bench_flags(&self) -> Vec<String> {
        self.section(Section::DbBench)
            .map(|keys| {
                keys.iter()
                    .map(|(key, value)| format!("--{}={}", key, value))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A sparse set of overrides, typically a proposal's delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartialConfiguration {
    settings: Settings,
}

impl PartialConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set(&mut self, section: Section, key: impl Into<String>, value: impl Into<Value>) {
        self.settings
            .entry(section)
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn with(mut self, section: Section, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(section, key, value);
        self
    }

    pub fn get(&self, section: Section, key: &str) -> Option<&Value> {
        self.settings.get(&section).and_then(|keys| keys.get(key))
    }

    pub fn len(&self) -> usize {
        self.settings.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Section, &str, &Value)> {
        self.settings.iter().flat_map(|(section, keys)| {
            keys.iter()
                .map(move |(key, value)| (*section, key.as_str(), value))
        })
    }

    /// Type-check the delta without requiring any key to be present.
    pub fn check(&self) -> Result<(), SchemaError> {
        Schema::rocksdb().check_types(&self.settings)
    }
}

/// A configuration that passed full schema validation.
///
/// Only [`Configuration::resolve`] (or deserialization, which re-validates)
/// produces one, so holding this type means every required key is present
/// and correctly typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Configuration", try_from = "Configuration")]
pub struct ResolvedConfiguration {
    inner: Configuration,
}

impl ResolvedConfiguration {
    pub fn as_config(&self) -> &Configuration {
        &self.inner
    }

    pub fn into_inner(self) -> Configuration {
        self.inner
    }
}

impl Deref for ResolvedConfiguration {
    type Target = Configuration;

    fn deref(&self) -> &Configuration {
        &self.inner
    }
}

impl From<ResolvedConfiguration> for Configuration {
    fn from(resolved: ResolvedConfiguration) -> Self {
        resolved.inner
    }
}

impl TryFrom<Configuration> for ResolvedConfiguration {
    type Error = SchemaError;

    fn try_from(config: Configuration) -> Result<Self, SchemaError> {
        config.resolve()
    }
}

/// Overlay `delta` on `base`.
///
/// Keys present in the delta take the delta's value; every other key keeps
/// the base value. The result is type-checked before it is returned.
pub fn merge(base: &Configuration, delta: &PartialConfiguration) -> Result<Configuration, SchemaError> {
    let mut merged = base.clone();
    for (section, key, value) in delta.iter() {
        merged.set(section, key, value.clone());
    }
    Schema::rocksdb().check_types(merged.settings())?;
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::default_seed;

    #[test]
    fn test_merge_overrides_and_retains() {
        let base = default_seed();
        let delta = PartialConfiguration::new()
            .with(Section::DbOptions, "max_background_jobs", 8i64)
            .with(Section::CfOptions, "compression", "kLZ4Compression");

        let merged = merge(&base, &delta).unwrap();

        for (section, key, value) in delta.iter() {
            assert_eq!(merged.get(section, key), Some(value));
        }
        for (section, key, value) in base.iter() {
            if delta.get(section, key).is_none() {
                assert_eq!(merged.get(section, key), Some(value));
            }
        }
        assert_eq!(merged.len(), base.len());
    }

    #[test]
    fn test_merge_rejects_wrongly_typed_delta() {
        let base = default_seed();
        let delta = PartialConfiguration::new().with(Section::DbOptions, "max_open_files", "unlimited");
        let err = merge(&base, &delta).unwrap_err();
        assert_eq!(err.issues()[0].key, "max_open_files");
    }

    #[test]
    fn test_resolve_requires_all_required_keys() {
        let partial = Configuration::new().with(Section::DbOptions, "max_background_jobs", 2i64);
        assert!(partial.resolve().is_err());
        assert!(default_seed().resolve().is_ok());
    }

    #[test]
    fn test_resolved_deserialization_revalidates() {
        let resolved = default_seed().resolve().unwrap();
        let json = serde_json::to_string(&resolved).unwrap();
        let back: ResolvedConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, resolved);

        let incomplete = r#"{"db_options": {"max_background_jobs": 2}}"#;
        assert!(serde_json::from_str::<ResolvedConfiguration>(incomplete).is_err());
    }

    #[test]
    fn test_bench_flags() {
        let config = Configuration::new()
            .with(Section::DbBench, "bloom_bits", 10i64)
            .with(Section::DbBench, "cache_size", 8388608i64)
            .with(Section::DbOptions, "max_open_files", -1i64);
        assert_eq!(
            config.bench_flags(),
            vec!["--bloom_bits=10".to_string(), "--cache_size=8388608".to_string()]
        );
    }
}
