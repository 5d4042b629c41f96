//! Static schema of tunable keys.
//!
//! Every key the tuner knows about is listed once with its section, value
//! kind and whether it must be present before a benchmark may run. Keys
//! outside the table are reported as unknown rather than passed through.

use crate::config::Settings;
use crate::error::{IssueKind, SchemaError, SchemaIssue};
use crate::section::Section;
use crate::value::Value;

/// Kind of value a key accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyKind {
    Int,
    Float,
    Bool,
    Enum(&'static [&'static str]),
    Text,
}

impl KeyKind {
    pub fn describe(&self) -> String {
        match self {
            KeyKind::Int => "int".into(),
            KeyKind::Float => "float".into(),
            KeyKind::Bool => "bool".into(),
            KeyKind::Enum(allowed) => format!("one of [{}]", allowed.join(", ")),
            KeyKind::Text => "text".into(),
        }
    }

    /// Read raw options-file text as this kind. No coercion is attempted.
    pub fn parse(&self, raw: &str) -> Result<Value, IssueKind> {
        let raw = raw.trim();
        let unparsable = || IssueKind::Unparsable {
            raw: raw.to_string(),
            expected: self.describe(),
        };
        match self {
            KeyKind::Int => raw.parse::<i128>().map(Value::Int).map_err(|_| unparsable()),
            KeyKind::Float => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Value::Float(v)),
                _ => Err(unparsable()),
            },
            KeyKind::Bool => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(unparsable()),
            },
            KeyKind::Enum(allowed) => {
                if allowed.contains(&raw) {
                    Ok(Value::Text(raw.to_string()))
                } else {
                    Err(not_in_enum(raw, allowed))
                }
            }
            KeyKind::Text => Ok(Value::Text(raw.to_string())),
        }
    }

    /// Type-check an already typed value.
    pub fn check(&self, value: &Value) -> Result<(), IssueKind> {
        let ok = match (self, value) {
            (KeyKind::Int, Value::Int(_)) => true,
            (KeyKind::Float, Value::Int(_) | Value::Float(_)) => true,
            (KeyKind::Bool, Value::Bool(_)) => true,
            (KeyKind::Text, Value::Text(_)) => true,
            (KeyKind::Enum(allowed), Value::Text(text)) => {
                if allowed.contains(&text.as_str()) {
                    true
                } else {
                    return Err(not_in_enum(text, allowed));
                }
            }
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(IssueKind::WrongType {
                expected: self.describe(),
                found: value.type_name().into(),
            })
        }
    }
}

fn not_in_enum(value: &str, allowed: &[&str]) -> IssueKind {
    IssueKind::NotInEnum {
        value: value.to_string(),
        allowed: allowed.iter().map(|s| s.to_string()).collect(),
    }
}

/// Schema entry for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySpec {
    pub section: Section,
    pub name: &'static str,
    pub kind: KeyKind,
    pub required: bool,
}

impl KeySpec {
    const fn new(section: Section, name: &'static str, kind: KeyKind) -> Self {
        Self {
            section,
            name,
            kind,
            required: false,
        }
    }

    const fn req(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// A static table of key specifications.
#[derive(Debug)]
pub struct Schema {
    keys: &'static [KeySpec],
}

static ROCKSDB: Schema = Schema { keys: ROCKSDB_KEYS };

impl Schema {
    /// Schema for RocksDB options plus `db_bench` flags.
    pub fn rocksdb() -> &'static Schema {
        &ROCKSDB
    }

    pub fn keys(&self) -> &'static [KeySpec] {
        self.keys
    }

    pub fn lookup(&self, section: Section, name: &str) -> Option<&'static KeySpec> {
        self.keys
            .iter()
            .find(|spec| spec.section == section && spec.name == name)
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &'static KeySpec> {
        self.keys.iter().filter(|spec| spec.required)
    }

    /// Parse raw text for a key, treating unknown keys as opaque text.
    pub fn parse_value(&self, section: Section, name: &str, raw: &str) -> Result<Value, IssueKind> {
        match self.lookup(section, name) {
            Some(spec) => spec.kind.parse(raw),
            None => Ok(Value::Text(raw.trim().to_string())),
        }
    }

    /// Type-check every present value. Missing keys are not reported.
    pub fn check_types(&self, settings: &Settings) -> Result<(), SchemaError> {
        let issues = self.type_issues(settings);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(issues))
        }
    }

    /// Full validation: types of present values plus presence of every
    /// required key.
    pub fn validate(&self, settings: &Settings) -> Result<(), SchemaError> {
        let mut issues = self.type_issues(settings);
        for spec in self.required_keys() {
            let present = settings
                .get(&spec.section)
                .is_some_and(|keys| keys.contains_key(spec.name));
            if !present {
                issues.push(SchemaIssue {
                    section: spec.section,
                    key: spec.name.to_string(),
                    issue: IssueKind::MissingRequired,
                });
            }
        }
        if issues.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid(issues))
        }
    }

    fn type_issues(&self, settings: &Settings) -> Vec<SchemaIssue> {
        let mut issues = Vec::new();
        for (section, keys) in settings {
            for (key, value) in keys {
                let outcome = match self.lookup(*section, key) {
                    Some(spec) => spec.kind.check(value),
                    None => Err(IssueKind::UnknownKey),
                };
                if let Err(issue) = outcome {
                    issues.push(SchemaIssue {
                        section: *section,
                        key: key.clone(),
                        issue,
                    });
                }
            }
        }
        issues
    }
}

const COMPRESSION: &[&str] = &[
    "kNoCompression",
    "kSnappyCompression",
    "kZlibCompression",
    "kBZip2Compression",
    "kLZ4Compression",
    "kLZ4HCCompression",
    "kXpressCompression",
    "kZSTD",
    "kDisableCompressionOption",
];
const WAL_COMPRESSION: &[&str] = &["kNoCompression", "kZSTD"];
const INFO_LOG_LEVEL: &[&str] = &[
    "DEBUG_LEVEL",
    "INFO_LEVEL",
    "WARN_LEVEL",
    "ERROR_LEVEL",
    "FATAL_LEVEL",
    "HEADER_LEVEL",
];
const WAL_RECOVERY_MODE: &[&str] = &[
    "kTolerateCorruptedTailRecords",
    "kAbsoluteConsistency",
    "kPointInTimeRecovery",
    "kSkipAnyCorruptedRecords",
];
const ACCESS_HINT: &[&str] = &["NONE", "NORMAL", "SEQUENTIAL", "WILLNEED"];
const CACHE_TIER: &[&str] = &["kVolatileTier", "kNonVolatileBlockTier"];
const TEMPERATURE: &[&str] = &["kUnknown", "kHot", "kWarm", "kCold"];
const PREPOPULATE: &[&str] = &["kDisable", "kFlushOnly"];
const COMPACTION_STYLE: &[&str] = &[
    "kCompactionStyleLevel",
    "kCompactionStyleUniversal",
    "kCompactionStyleFIFO",
    "kCompactionStyleNone",
];
const COMPACTION_PRI: &[&str] = &[
    "kByCompensatedSize",
    "kOldestLargestSeqFirst",
    "kOldestSmallestSeqFirst",
    "kMinOverlappingRatio",
    "kRoundRobin",
];
const INDEX_TYPE: &[&str] = &[
    "kBinarySearch",
    "kHashSearch",
    "kTwoLevelIndexSearch",
    "kBinarySearchWithFirstKey",
];
const DATA_BLOCK_INDEX_TYPE: &[&str] = &["kDataBlockBinarySearch", "kDataBlockBinaryAndHash"];
const CHECKSUM: &[&str] = &["kNoChecksum", "kCRC32c", "kxxHash", "kxxHash64", "kXXH3"];
const INDEX_SHORTENING: &[&str] = &[
    "kNoShortening",
    "kShortenSeparators",
    "kShortenSeparatorsAndSuccessor",
];

use KeyKind::{Bool, Float, Int, Text};
use Section::{CfOptions as CF, DbBench as BENCH, DbOptions as DB, TableOptions as TABLE, Version as VER};

const fn e(section: Section, name: &'static str, allowed: &'static [&'static str]) -> KeySpec {
    KeySpec::new(section, name, KeyKind::Enum(allowed))
}

static ROCKSDB_KEYS: &[KeySpec] = &[
    // db_bench flags
    KeySpec::new(BENCH, "cache_size", Int).req(),
    KeySpec::new(BENCH, "bloom_bits", Int).req(),
    KeySpec::new(BENCH, "use_ribbon_filter", Bool),
    KeySpec::new(BENCH, "row_cache_size", Int),
    KeySpec::new(BENCH, "cache_numshardbits", Int),
    KeySpec::new(BENCH, "enable_io_prio", Bool),
    KeySpec::new(BENCH, "enable_cpu_prio", Bool),
    KeySpec::new(BENCH, "file_checksum", Bool),
    KeySpec::new(BENCH, "use_keep_filter", Bool),
    // version
    KeySpec::new(VER, "rocksdb_version", Text).req(),
    KeySpec::new(VER, "options_file_version", Text).req(),
    // DB options
    KeySpec::new(DB, "max_background_flushes", Int),
    KeySpec::new(DB, "compaction_readahead_size", Int),
    KeySpec::new(DB, "wal_bytes_per_sync", Int).req(),
    KeySpec::new(DB, "bytes_per_sync", Int).req(),
    KeySpec::new(DB, "max_open_files", Int).req(),
    KeySpec::new(DB, "stats_history_buffer_size", Int),
    KeySpec::new(DB, "stats_dump_period_sec", Int),
    KeySpec::new(DB, "stats_persist_period_sec", Int),
    KeySpec::new(DB, "delete_obsolete_files_period_micros", Int),
    KeySpec::new(DB, "max_total_wal_size", Int),
    KeySpec::new(DB, "strict_bytes_per_sync", Bool),
    KeySpec::new(DB, "delayed_write_rate", Int),
    KeySpec::new(DB, "avoid_flush_during_shutdown", Bool),
    KeySpec::new(DB, "writable_file_max_buffer_size", Int),
    KeySpec::new(DB, "max_subcompactions", Int).req(),
    KeySpec::new(DB, "max_background_compactions", Int),
    KeySpec::new(DB, "max_background_jobs", Int).req(),
    e(DB, "lowest_used_cache_tier", CACHE_TIER),
    KeySpec::new(DB, "bgerror_resume_retry_interval", Int),
    KeySpec::new(DB, "max_bgerror_resume_count", Int),
    KeySpec::new(DB, "best_efforts_recovery", Bool),
    KeySpec::new(DB, "write_dbid_to_manifest", Bool),
    KeySpec::new(DB, "avoid_unnecessary_blocking_io", Bool),
    KeySpec::new(DB, "atomic_flush", Bool),
    KeySpec::new(DB, "log_readahead_size", Int),
    KeySpec::new(DB, "dump_malloc_stats", Bool),
    e(DB, "info_log_level", INFO_LOG_LEVEL),
    KeySpec::new(DB, "write_thread_max_yield_usec", Int),
    KeySpec::new(DB, "max_write_batch_group_size_bytes", Int),
    e(DB, "wal_compression", WAL_COMPRESSION),
    KeySpec::new(DB, "write_thread_slow_yield_usec", Int),
    KeySpec::new(DB, "enable_pipelined_write", Bool),
    KeySpec::new(DB, "persist_stats_to_disk", Bool),
    KeySpec::new(DB, "max_manifest_file_size", Int),
    KeySpec::new(DB, "WAL_size_limit_MB", Int),
    KeySpec::new(DB, "fail_if_options_file_error", Bool),
    KeySpec::new(DB, "max_log_file_size", Int),
    KeySpec::new(DB, "manifest_preallocation_size", Int),
    KeySpec::new(DB, "listeners", Text),
    KeySpec::new(DB, "log_file_time_to_roll", Int),
    KeySpec::new(DB, "allow_data_in_errors", Bool),
    KeySpec::new(DB, "WAL_ttl_seconds", Int),
    KeySpec::new(DB, "recycle_log_file_num", Int),
    KeySpec::new(DB, "file_checksum_gen_factory", Text),
    KeySpec::new(DB, "keep_log_file_num", Int),
    KeySpec::new(DB, "db_write_buffer_size", Int),
    KeySpec::new(DB, "table_cache_numshardbits", Int),
    KeySpec::new(DB, "use_adaptive_mutex", Bool),
    KeySpec::new(DB, "allow_ingest_behind", Bool),
    KeySpec::new(DB, "skip_checking_sst_file_sizes_on_db_open", Bool),
    KeySpec::new(DB, "random_access_max_buffer_size", Int),
    e(DB, "access_hint_on_compaction_start", ACCESS_HINT),
    KeySpec::new(DB, "allow_concurrent_memtable_write", Bool),
    KeySpec::new(DB, "track_and_verify_wals_in_manifest", Bool),
    KeySpec::new(DB, "skip_stats_update_on_db_open", Bool),
    KeySpec::new(DB, "compaction_verify_record_count", Bool),
    KeySpec::new(DB, "paranoid_checks", Bool),
    KeySpec::new(DB, "max_file_opening_threads", Int),
    KeySpec::new(DB, "verify_sst_unique_id_in_manifest", Bool),
    KeySpec::new(DB, "avoid_flush_during_recovery", Bool),
    KeySpec::new(DB, "flush_verify_memtable_count", Bool),
    KeySpec::new(DB, "db_host_id", Text),
    KeySpec::new(DB, "error_if_exists", Bool),
    e(DB, "wal_recovery_mode", WAL_RECOVERY_MODE),
    KeySpec::new(DB, "enable_thread_tracking", Bool),
    KeySpec::new(DB, "is_fd_close_on_exec", Bool),
    KeySpec::new(DB, "enforce_single_del_contracts", Bool),
    KeySpec::new(DB, "create_missing_column_families", Bool),
    KeySpec::new(DB, "create_if_missing", Bool).req(),
    KeySpec::new(DB, "use_fsync", Bool),
    KeySpec::new(DB, "wal_filter", Text),
    KeySpec::new(DB, "allow_2pc", Bool),
    KeySpec::new(DB, "use_direct_io_for_flush_and_compaction", Bool),
    KeySpec::new(DB, "manual_wal_flush", Bool),
    KeySpec::new(DB, "enable_write_thread_adaptive_yield", Bool),
    KeySpec::new(DB, "use_direct_reads", Bool),
    KeySpec::new(DB, "allow_mmap_writes", Bool),
    KeySpec::new(DB, "allow_fallocate", Bool),
    KeySpec::new(DB, "two_write_queues", Bool),
    KeySpec::new(DB, "allow_mmap_reads", Bool),
    KeySpec::new(DB, "unordered_write", Bool),
    KeySpec::new(DB, "advise_random_on_open", Bool),
    // column family options
    KeySpec::new(CF, "memtable_max_range_deletions", Int),
    KeySpec::new(CF, "block_protection_bytes_per_key", Int),
    KeySpec::new(CF, "memtable_protection_bytes_per_key", Int),
    KeySpec::new(CF, "sample_for_compression", Int),
    KeySpec::new(CF, "blob_file_starting_level", Int),
    KeySpec::new(CF, "blob_compaction_readahead_size", Int),
    KeySpec::new(CF, "blob_garbage_collection_force_threshold", Float),
    KeySpec::new(CF, "enable_blob_garbage_collection", Bool),
    KeySpec::new(CF, "min_blob_size", Int),
    e(CF, "last_level_temperature", TEMPERATURE),
    KeySpec::new(CF, "enable_blob_files", Bool),
    KeySpec::new(CF, "target_file_size_base", Int).req(),
    KeySpec::new(CF, "max_sequential_skip_in_iterations", Int),
    e(CF, "prepopulate_blob_cache", PREPOPULATE),
    KeySpec::new(CF, "compaction_options_fifo", Text),
    KeySpec::new(CF, "max_bytes_for_level_multiplier", Float).req(),
    KeySpec::new(CF, "max_bytes_for_level_multiplier_additional", Text),
    KeySpec::new(CF, "max_bytes_for_level_base", Int).req(),
    KeySpec::new(CF, "experimental_mempurge_threshold", Float),
    KeySpec::new(CF, "write_buffer_size", Int).req(),
    e(CF, "bottommost_compression", COMPRESSION),
    KeySpec::new(CF, "prefix_extractor", Text),
    KeySpec::new(CF, "blob_file_size", Int),
    KeySpec::new(CF, "memtable_huge_page_size", Int),
    KeySpec::new(CF, "bottommost_file_compaction_delay", Int),
    KeySpec::new(CF, "max_successive_merges", Int),
    KeySpec::new(CF, "compression_opts", Text),
    KeySpec::new(CF, "arena_block_size", Int),
    KeySpec::new(CF, "memtable_whole_key_filtering", Bool),
    KeySpec::new(CF, "target_file_size_multiplier", Int),
    KeySpec::new(CF, "max_write_buffer_number", Int).req(),
    e(CF, "blob_compression_type", COMPRESSION),
    e(CF, "compression", COMPRESSION).req(),
    KeySpec::new(CF, "level0_stop_writes_trigger", Int).req(),
    KeySpec::new(CF, "level0_slowdown_writes_trigger", Int).req(),
    KeySpec::new(CF, "level0_file_num_compaction_trigger", Int).req(),
    KeySpec::new(CF, "ignore_max_compaction_bytes_for_input", Bool),
    KeySpec::new(CF, "max_compaction_bytes", Int),
    KeySpec::new(CF, "compaction_options_universal", Text),
    KeySpec::new(CF, "memtable_prefix_bloom_size_ratio", Float),
    KeySpec::new(CF, "hard_pending_compaction_bytes_limit", Int),
    KeySpec::new(CF, "bottommost_compression_opts", Text),
    KeySpec::new(CF, "blob_garbage_collection_age_cutoff", Float),
    KeySpec::new(CF, "ttl", Int),
    KeySpec::new(CF, "soft_pending_compaction_bytes_limit", Int),
    KeySpec::new(CF, "inplace_update_num_locks", Int),
    KeySpec::new(CF, "paranoid_file_checks", Bool),
    KeySpec::new(CF, "check_flush_compaction_key_order", Bool),
    KeySpec::new(CF, "periodic_compaction_seconds", Int),
    KeySpec::new(CF, "disable_auto_compactions", Bool),
    KeySpec::new(CF, "report_bg_io_stats", Bool),
    e(CF, "compaction_pri", COMPACTION_PRI),
    e(CF, "compaction_style", COMPACTION_STYLE).req(),
    KeySpec::new(CF, "merge_operator", Text),
    KeySpec::new(CF, "table_factory", Text),
    KeySpec::new(CF, "memtable_factory", Text),
    KeySpec::new(CF, "comparator", Text),
    KeySpec::new(CF, "compaction_filter_factory", Text),
    KeySpec::new(CF, "num_levels", Int).req(),
    KeySpec::new(CF, "min_write_buffer_number_to_merge", Int).req(),
    KeySpec::new(CF, "bloom_locality", Int),
    KeySpec::new(CF, "max_write_buffer_size_to_maintain", Int),
    KeySpec::new(CF, "sst_partitioner_factory", Text),
    KeySpec::new(CF, "preserve_internal_time_seconds", Int),
    KeySpec::new(CF, "preclude_last_level_data_seconds", Int),
    KeySpec::new(CF, "max_write_buffer_number_to_maintain", Int),
    e(CF, "default_temperature", TEMPERATURE),
    KeySpec::new(CF, "optimize_filters_for_hits", Bool),
    KeySpec::new(CF, "level_compaction_dynamic_file_size", Bool),
    KeySpec::new(CF, "memtable_insert_with_hint_prefix_extractor", Text),
    KeySpec::new(CF, "level_compaction_dynamic_level_bytes", Bool),
    KeySpec::new(CF, "inplace_update_support", Bool),
    KeySpec::new(CF, "persist_user_defined_timestamps", Bool),
    KeySpec::new(CF, "compaction_filter", Text),
    KeySpec::new(CF, "force_consistency_checks", Bool),
    // block-based table options
    KeySpec::new(TABLE, "num_file_reads_for_auto_readahead", Int),
    KeySpec::new(TABLE, "initial_auto_readahead_size", Int),
    KeySpec::new(TABLE, "metadata_cache_options", Text),
    KeySpec::new(TABLE, "enable_index_compression", Bool),
    KeySpec::new(TABLE, "pin_top_level_index_and_filter", Bool),
    KeySpec::new(TABLE, "read_amp_bytes_per_bit", Int),
    KeySpec::new(TABLE, "verify_compression", Bool),
    e(TABLE, "prepopulate_block_cache", PREPOPULATE),
    KeySpec::new(TABLE, "format_version", Int).req(),
    KeySpec::new(TABLE, "partition_filters", Bool),
    KeySpec::new(TABLE, "metadata_block_size", Int),
    KeySpec::new(TABLE, "max_auto_readahead_size", Int),
    KeySpec::new(TABLE, "index_block_restart_interval", Int),
    KeySpec::new(TABLE, "block_size_deviation", Int),
    KeySpec::new(TABLE, "block_size", Int).req(),
    KeySpec::new(TABLE, "detect_filter_construct_corruption", Bool),
    KeySpec::new(TABLE, "no_block_cache", Bool),
    e(TABLE, "checksum", CHECKSUM),
    KeySpec::new(TABLE, "filter_policy", Text).req(),
    KeySpec::new(TABLE, "data_block_hash_table_util_ratio", Float),
    KeySpec::new(TABLE, "block_restart_interval", Int),
    e(TABLE, "index_type", INDEX_TYPE),
    KeySpec::new(TABLE, "pin_l0_filter_and_index_blocks_in_cache", Bool),
    e(TABLE, "data_block_index_type", DATA_BLOCK_INDEX_TYPE),
    KeySpec::new(TABLE, "cache_index_and_filter_blocks_with_high_priority", Bool),
    KeySpec::new(TABLE, "whole_key_filtering", Bool),
    e(TABLE, "index_shortening", INDEX_SHORTENING),
    KeySpec::new(TABLE, "cache_index_and_filter_blocks", Bool).req(),
    KeySpec::new(TABLE, "block_align", Bool),
    KeySpec::new(TABLE, "optimize_filters_for_memory", Bool),
    KeySpec::new(TABLE, "flush_block_policy_factory", Text),
];
