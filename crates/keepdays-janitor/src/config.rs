//! Configuration for Janitor operations
//!
//! Defines the archive bucket, metric namespace, tag name, retention tables
//! and the scheduled sweep interval.

use crate::JanitorError;
use keepdays_domain::{RetentionPolicy, Tier};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the Janitor service
///
/// # Examples
///
/// ```
/// use keepdays_janitor::JanitorConfig;
///
/// let config = JanitorConfig::default();
/// assert_eq!(config.tag_key, "keep-days");
///
/// let config = JanitorConfig::from_toml_str(r#"
///     archive_bucket = "backups"
///
///     [retention]
///     default = [365, 180, 90, 30, 14, 7]
/// "#).unwrap();
/// assert_eq!(config.archive_bucket, "backups");
/// assert!(config.retention.groups.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JanitorConfig {
    /// Bucket reconciled by scheduled runs
    /// Default: com.mysite.myarchive.bucket
    #[serde(default = "default_archive_bucket")]
    pub archive_bucket: String,

    /// Namespace metrics are published under
    /// Default: SimpleS3BackupManager
    #[serde(default = "default_metric_namespace")]
    pub metric_namespace: String,

    /// Name of the object tag holding the retention day count
    /// Default: keep-days
    #[serde(default = "default_tag_key")]
    pub tag_key: String,

    /// How often the worker runs a scheduled reconciliation (in minutes)
    /// Default: 1440 (daily)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,

    /// Dry-run mode: log the tags that would be written without writing them
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,

    /// Keep-days tables, per archive group with a default
    #[serde(default)]
    pub retention: RetentionPolicy,
}

/// Longest accepted sweep interval: one year
pub const MAX_SWEEP_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

fn default_archive_bucket() -> String {
    "com.mysite.myarchive.bucket".to_string()
}

fn default_metric_namespace() -> String {
    "SimpleS3BackupManager".to_string()
}

fn default_tag_key() -> String {
    "keep-days".to_string()
}

fn default_sweep_interval() -> u64 {
    24 * 60
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            archive_bucket: default_archive_bucket(),
            metric_namespace: default_metric_namespace(),
            tag_key: default_tag_key(),
            sweep_interval_minutes: default_sweep_interval(),
            dry_run: false,
            retention: RetentionPolicy::default(),
        }
    }
}

impl JanitorConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, JanitorError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JanitorError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, JanitorError> {
        let config: JanitorConfig = toml::from_str(contents)
            .map_err(|e| JanitorError::Config(format!("Failed to parse config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String, JanitorError> {
        toml::to_string_pretty(self)
            .map_err(|e| JanitorError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Reject unusable settings and log suspicious retention tables
    ///
    /// Tables that do not have one entry per tier, or that grow from coarse to
    /// fine tiers, are accepted with a warning.
    pub fn validate(&self) -> Result<(), JanitorError> {
        if self.archive_bucket.trim().is_empty() {
            return Err(JanitorError::Config("archive_bucket must not be empty".to_string()));
        }
        if self.tag_key.trim().is_empty() {
            return Err(JanitorError::Config("tag_key must not be empty".to_string()));
        }
        if !(1..=MAX_SWEEP_INTERVAL_MINUTES).contains(&self.sweep_interval_minutes) {
            return Err(JanitorError::Config(format!(
                "sweep_interval_minutes must be between 1 and {}",
                MAX_SWEEP_INTERVAL_MINUTES
            )));
        }
        self.retention.validate()?;

        for group in self.retention.irregular_tables() {
            tracing::warn!(
                "Retention table '{}' should have {} non-increasing entries; \
                 archives in tiers it does not cover will be skipped",
                group,
                Tier::COUNT
            );
        }
        Ok(())
    }

    /// Get sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.saturating_mul(60))
    }
}
