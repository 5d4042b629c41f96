//! Built-in starting configuration.

use crate::config::Configuration;
use crate::format::parse_options;

/// Stock RocksDB 8.x settings with `db_bench` defaults, covering every
/// required key.
pub const DEFAULT_OPTIONS: &str = r#"[DBBenchOptions]
  bloom_bits=10
  cache_numshardbits=6
  cache_size=8388608
  row_cache_size=0

[Version]
  options_file_version=1.1
  rocksdb_version=8.8.1

[DBOptions]
  allow_concurrent_memtable_write=true
  bytes_per_sync=0
  compaction_readahead_size=2097152
  create_if_missing=true
  delayed_write_rate=16777216
  enable_pipelined_write=false
  max_background_compactions=-1
  max_background_flushes=-1
  max_background_jobs=2
  max_open_files=-1
  max_subcompactions=1
  max_total_wal_size=0
  stats_dump_period_sec=600
  use_direct_io_for_flush_and_compaction=false
  use_direct_reads=false
  wal_bytes_per_sync=0
  wal_recovery_mode=kPointInTimeRecovery

[CFOptions "default"]
  compaction_pri=kMinOverlappingRatio
  compaction_style=kCompactionStyleLevel
  compression=kSnappyCompression
  level0_file_num_compaction_trigger=4
  level0_slowdown_writes_trigger=20
  level0_stop_writes_trigger=36
  level_compaction_dynamic_level_bytes=true
  max_bytes_for_level_base=268435456
  max_bytes_for_level_multiplier=10
  max_write_buffer_number=2
  min_write_buffer_number_to_merge=1
  num_levels=7
  target_file_size_base=67108864
  write_buffer_size=67108864

[TableOptions/BlockBasedTable "default"]
  block_restart_interval=16
  block_size=4096
  cache_index_and_filter_blocks=false
  checksum=kXXH3
  filter_policy=bloomfilter:10:false
  format_version=5
  index_type=kBinarySearch
  pin_l0_filter_and_index_blocks_in_cache=false
  whole_key_filtering=true
"#;

/// The built-in seed configuration.
pub fn default_seed() -> Configuration {
    parse_options(DEFAULT_OPTIONS).expect("built-in default options parse")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;

    #[test]
    fn test_default_seed_is_fully_resolved() {
        let seed = default_seed();
        assert!(Schema::rocksdb().validate(seed.settings()).is_ok());
        for spec in Schema::rocksdb().required_keys() {
            assert!(seed.get(spec.section, spec.name).is_some(), "{} missing", spec.name);
        }
    }
}
