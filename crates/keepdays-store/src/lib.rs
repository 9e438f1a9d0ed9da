//! Keepdays Storage Layer
//!
//! Implements the `ArchiveStore` trait for local buckets.
//!
//! # Architecture
//!
//! - [`SqliteBucket`]: SQLite tables for objects and their tag sets, used by
//!   the CLI as a stand-in for a remote object store
//! - [`MemoryBucket`]: in-process maps, with switchable failures for tests
//!
//! # Examples
//!
//! ```no_run
//! use keepdays_domain::traits::ArchiveStore;
//! use keepdays_store::SqliteBucket;
//!
//! let mut store = SqliteBucket::new("archives.db").unwrap();
//! store.put_object("backups", "2023-01-01/00-00-00_documents.tar", None).unwrap();
//! store.put_tag("backups", "2023-01-01/00-00-00_documents.tar", "keep-days", "1095").unwrap();
//! ```

#![warn(missing_docs)]

mod memory;
mod sqlite;

pub use memory::MemoryBucket;
pub use sqlite::SqliteBucket;

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Object does not exist in the bucket
    #[error("Object not found: s3://{bucket}/{key}")]
    NotFound {
        /// Bucket name
        bucket: String,
        /// Object key
        key: String,
    },

    /// The store refused or could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
