//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One stored object as reported by a bucket listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry {
    /// Object key
    pub key: String,

    /// Object size in bytes, when the store reports it
    #[serde(default)]
    pub size: Option<u64>,
}

impl ObjectEntry {
    /// Entry with only a key
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
        }
    }
}

/// Trait for listing archives and reading/writing their tags
///
/// Implemented by the infrastructure layer (keepdays-store)
pub trait ArchiveStore {
    /// Error type for store operations
    type Error;

    /// Enumerate every object in a bucket
    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>, Self::Error>;

    /// Read a single tag value from an object
    ///
    /// Returns `Ok(None)` when the object has no tag with this name.
    fn get_tag(&self, bucket: &str, key: &str, tag: &str) -> Result<Option<String>, Self::Error>;

    /// Set a tag on an object, replacing the object's tag set
    fn put_tag(
        &mut self,
        bucket: &str,
        key: &str,
        tag: &str,
        value: &str,
    ) -> Result<(), Self::Error>;
}

/// Unit attached to a metric datum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MetricUnit {
    /// Unitless value
    #[default]
    None,
    /// A count of things
    Count,
    /// Elapsed seconds
    Seconds,
}

impl MetricUnit {
    /// Wire name of the unit
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::None => "None",
            MetricUnit::Count => "Count",
            MetricUnit::Seconds => "Seconds",
        }
    }
}

impl fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A name/value pair a metric is sliced by
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name (e.g. `ArchiveGroup`)
    pub name: String,
    /// Dimension value
    pub value: String,
}

impl Dimension {
    /// Create a dimension
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One metric observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    /// Metric name
    pub name: String,
    /// Dimensions
    pub dimensions: Vec<Dimension>,
    /// When the observation was made
    pub timestamp: DateTime<Utc>,
    /// Observed value
    pub value: f64,
    /// Unit of `value`
    pub unit: MetricUnit,
}

/// Trait for publishing metrics
///
/// Publishing is fire-and-forget from the caller's point of view: callers log
/// errors and carry on.
pub trait MetricsSink {
    /// Error type for publish operations
    type Error;

    /// Publish a batch of data points under a namespace
    fn put_metric_data(&mut self, namespace: &str, data: &[MetricDatum]) -> Result<(), Self::Error>;
}
