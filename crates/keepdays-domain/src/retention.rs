//! Retention tables: tier → keep-days, per archive group

use crate::tier::Tier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from retention lookups and table validation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The tier has no entry in the group's table
    #[error("Tier {tier} is outside the retention table for '{group}' ({len} entries)")]
    TierOutOfRange {
        /// Archive group being looked up
        group: String,
        /// Requested tier
        tier: Tier,
        /// Length of the table that was consulted
        len: usize,
    },

    /// A configured table has no entries
    #[error("Retention table for '{0}' is empty")]
    EmptyTable(String),
}

/// Keep-days per tier, indexed by [`Tier::index`]
///
/// Tables are expected to have one entry per tier and to be non-increasing
/// (coarser tiers keep at least as long as finer ones). Neither property is
/// enforced here; see [`RetentionTable::is_monotonic`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetentionTable(Vec<u32>);

impl RetentionTable {
    /// Create a table from day counts, coarsest tier first
    pub fn new(days: Vec<u32>) -> Self {
        Self(days)
    }

    /// Days for a tier, if the table covers it
    pub fn days(&self, tier: Tier) -> Option<u32> {
        self.0.get(tier.index()).copied()
    }

    /// Raw day counts
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every entry is >= the one after it
    pub fn is_monotonic(&self) -> bool {
        self.0.windows(2).all(|pair| pair[0] >= pair[1])
    }

    /// Whether the table has exactly one entry per tier
    pub fn covers_all_tiers(&self) -> bool {
        self.0.len() == Tier::COUNT
    }
}

impl From<Vec<u32>> for RetentionTable {
    fn from(days: Vec<u32>) -> Self {
        Self(days)
    }
}

/// Maps `(archive group, tier)` to a keep-days value
///
/// Groups without their own table fall back to the default table.
///
/// # Examples
///
/// ```
/// use keepdays_domain::{RetentionPolicy, Tier};
///
/// let policy = RetentionPolicy::default();
/// assert_eq!(policy.retention_days("documents", Tier::YEARLY).unwrap(), 1095);
/// assert_eq!(policy.retention_days("photos", Tier::YEARLY).unwrap(), 3650);
/// assert_eq!(policy.retention_days("photos", Tier::ORDINARY).unwrap(), 15);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Table used when a group has no entry in `groups`
    pub default: RetentionTable,

    /// Group-specific tables
    #[serde(default)]
    pub groups: BTreeMap<String, RetentionTable>,
}

impl Default for RetentionPolicy {
    /// Ten years for yearly archives down to fifteen days for ordinary ones,
    /// with a shorter schedule for `documents`.
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        groups.insert(
            "documents".to_string(),
            RetentionTable::new(vec![1095, 365, 90, 30, 7, 3]),
        );
        Self {
            default: RetentionTable::new(vec![3650, 730, 365, 90, 30, 15]),
            groups,
        }
    }
}

impl RetentionPolicy {
    /// Add or replace a group-specific table
    pub fn set_group(&mut self, group: impl Into<String>, table: RetentionTable) {
        self.groups.insert(group.into(), table);
    }

    /// Table that applies to `group`
    pub fn table_for(&self, group: &str) -> &RetentionTable {
        self.groups.get(group).unwrap_or(&self.default)
    }

    /// Keep-days for an archive of `group` in `tier`
    ///
    /// # Errors
    /// [`ConfigError::TierOutOfRange`] if the applicable table is too short.
    pub fn retention_days(&self, group: &str, tier: Tier) -> Result<u32, ConfigError> {
        let table = self.table_for(group);
        table.days(tier).ok_or_else(|| ConfigError::TierOutOfRange {
            group: group.to_string(),
            tier,
            len: table.len(),
        })
    }

    /// Reject empty tables
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default.is_empty() {
            return Err(ConfigError::EmptyTable("default".to_string()));
        }
        for (group, table) in &self.groups {
            if table.is_empty() {
                return Err(ConfigError::EmptyTable(group.clone()));
            }
        }
        Ok(())
    }

    /// Names of tables (`"default"` included) that are not one-per-tier or
    /// not non-increasing
    pub fn irregular_tables(&self) -> Vec<String> {
        std::iter::once(("default", &self.default))
            .chain(self.groups.iter().map(|(g, t)| (g.as_str(), t)))
            .filter(|(_, table)| !table.covers_all_tiers() || !table.is_monotonic())
            .map(|(group, _)| group.to_string())
            .collect()
    }
}
