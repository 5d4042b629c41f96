//! Configuration model for the storage engine under test.
//!
//! A configuration is a set of named sections (benchmark flags, DB options,
//! column family options, block-based table options), each mapping keys to
//! typed [`Value`]s. The [`Schema`] is static: every known key has a kind and
//! a required/optional marker.
//!
//! # Key Components
//!
//! - [`Configuration`] / [`PartialConfiguration`]: full and sparse settings
//! - [`ResolvedConfiguration`]: a configuration that passed full validation,
//!   the only form accepted by benchmark runners
//! - [`merge`] and [`diff`]: overlay a proposal delta, compare two configurations
//! - [`format`]: the section-keyed `key=value` options file layout

pub mod config;
pub mod diff;
pub mod error;
pub mod format;
pub mod schema;
pub mod section;
pub mod seed;
pub mod value;

pub use config::{merge, Configuration, PartialConfiguration, ResolvedConfiguration, Settings};
pub use diff::{diff, ConfigDiff, KeyChange};
pub use error::{IssueKind, SchemaError, SchemaIssue};
pub use schema::{KeyKind, KeySpec, Schema};
pub use section::Section;
pub use value::Value;
