//! Keepdays Domain Layer
//!
//! This crate contains the core retention logic for keep-days tagging of
//! timestamped backup archives. It performs no I/O and defines the value
//! objects and trait interfaces the other crates depend upon.
//!
//! ## Key Concepts
//!
//! - **Archive key**: `{YYYY-MM-DD}/{HH-MM-SS}_{basename}.{ext}`, naming an
//!   archive group (`basename` minus its last extension) and a timestamp
//! - **Tier**: how calendar-significant an archive is within its group
//!   (0 = first of a year … 5 = ordinary)
//! - **Tier classifier**: date-part trie that assigns tiers in chronological order
//! - **Retention policy**: per-group tier → keep-days tables with a default
//!
//! ## Architecture
//!
//! - Pure business logic only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod archive_key;
pub mod classifier;
pub mod date_parts;
pub mod retention;
pub mod tier;
pub mod traits;

// Re-exports for convenience
pub use archive_key::{build_archive_key, parse_key, ArchiveKey, ParseError};
pub use classifier::TierClassifier;
pub use date_parts::{DatePart, DatePartPath};
pub use retention::{ConfigError, RetentionPolicy, RetentionTable};
pub use tier::Tier;
