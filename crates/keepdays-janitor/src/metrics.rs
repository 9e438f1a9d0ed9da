//! In-process counters for Janitor operations

use keepdays_domain::Tier;
use std::collections::BTreeMap;

/// Metrics collected during Janitor operations
///
/// Tracks tags written per tier, corrections per archive group, skipped keys
/// and sweep statistics across the lifetime of a [`crate::Janitor`].
#[derive(Debug, Clone, Default)]
pub struct JanitorMetrics {
    /// Tags written per tier
    pub tagged: BTreeMap<Tier, usize>,

    /// Tag corrections per archive group
    pub corrected: BTreeMap<String, usize>,

    /// Keys skipped because they could not be parsed or had no retention entry
    pub skipped: usize,

    /// Total reconciliation sweeps completed
    pub sweep_count: usize,

    /// Total runtime in seconds
    pub total_runtime_secs: u64,
}

impl JanitorMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tag written for an archive in `tier`
    pub fn record_tag(&mut self, tier: Tier) {
        *self.tagged.entry(tier).or_insert(0) += 1;
    }

    /// Record a corrected tag in `group`
    pub fn record_correction(&mut self, group: &str) {
        *self.corrected.entry(group.to_string()).or_insert(0) += 1;
    }

    /// Record a skipped key
    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    /// Record a sweep cycle completion
    pub fn record_sweep(&mut self) {
        self.sweep_count += 1;
    }

    /// Get total tags written across all tiers
    pub fn total_tagged(&self) -> usize {
        self.tagged.values().sum()
    }

    /// Get total corrections across all groups
    pub fn total_corrected(&self) -> usize {
        self.corrected.values().sum()
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        self.tagged.clear();
        self.corrected.clear();
        self.skipped = 0;
        self.sweep_count = 0;
        self.total_runtime_secs = 0;
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Janitor Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Sweep cycles: {}", self.sweep_count),
            format!("Total runtime: {}s", self.total_runtime_secs),
            format!("Skipped keys: {}", self.skipped),
            String::new(),
        ];

        if !self.tagged.is_empty() {
            lines.push("Tags written by tier:".to_string());
            for (tier, count) in &self.tagged {
                lines.push(format!("  {}: {}", tier.as_str(), count));
            }
            lines.push(format!("  Total: {}", self.total_tagged()));
            lines.push(String::new());
        }

        if !self.corrected.is_empty() {
            lines.push("Corrections by archive group:".to_string());
            for (group, count) in &self.corrected {
                lines.push(format!("  {}: {}", group, count));
            }
            lines.push(format!("  Total: {}", self.total_corrected()));
        }

        lines.join("\n")
    }
}
