//! Error types for Janitor operations

use keepdays_domain::{ConfigError, ParseError};
use thiserror::Error;

/// Errors that can occur during Janitor operations
#[derive(Error, Debug)]
pub enum JanitorError {
    /// An archive key could not be parsed
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// A tier has no entry in the applicable retention table
    #[error("Retention error: {0}")]
    Retention(#[from] ConfigError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage layer error, with the operation that failed
    #[error("Storage error during {operation} on s3://{bucket}/{key}: {message}")]
    Store {
        /// Operation name (list_objects, get_tag, put_tag)
        operation: &'static str,
        /// Bucket name
        bucket: String,
        /// Object key (empty for bucket-level operations)
        key: String,
        /// Underlying error text
        message: String,
    },

    /// The archive is not part of the collection being classified
    #[error("Archive {key} is not in group '{group}'")]
    UnknownArchive {
        /// Archive key
        key: String,
        /// Archive group
        group: String,
    },

    /// Invocation payload could not be understood
    #[error("Event error: {0}")]
    Event(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}
