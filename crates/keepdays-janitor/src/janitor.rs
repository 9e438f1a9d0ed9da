//! Core Janitor implementation: upload tagging and scheduled reconciliation

use crate::bucket::ArchiveBucket;
use crate::collection::{ArchiveCollection, GroupReport, TaggedArchive};
use crate::event::{Event, Invocation};
use crate::publisher::MetricManager;
use crate::{JanitorConfig, JanitorError, JanitorMetrics};
use keepdays_domain::traits::{ArchiveStore, Dimension, MetricUnit, MetricsSink};
use keepdays_domain::ArchiveKey;
use serde::Serialize;
use serde_json::Value;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::Instant;

/// Outcome of one scheduled reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Bucket that was reconciled
    pub bucket: String,
    /// Per-group results, sorted by group name
    pub groups: Vec<GroupReport>,
    /// Keys in the bucket that are not archive keys
    pub malformed: Vec<String>,
}

impl ReconcileReport {
    /// Tags corrected across all groups
    pub fn total_corrected(&self) -> usize {
        self.groups.iter().map(|g| g.corrected).sum()
    }

    /// Archives examined across all groups
    pub fn total_checked(&self) -> usize {
        self.groups.iter().map(|g| g.checked).sum()
    }

    /// Keys skipped: unparseable keys plus archives without a retention entry
    pub fn total_skipped(&self) -> usize {
        self.malformed.len() + self.groups.iter().map(|g| g.skipped.len()).sum::<usize>()
    }
}

/// What an invocation did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Newly uploaded archives were tagged
    Tagged {
        /// One entry per uploaded key
        archives: Vec<TaggedArchive>,
    },
    /// A scheduled reconciliation ran
    Reconciled {
        /// Reconciliation results
        report: ReconcileReport,
    },
    /// The payload was not a recognized event
    Ignored,
}

/// Janitor service: tags new archives and keeps existing tags in line with
/// the retention policy
///
/// # Examples
///
/// ```
/// use keepdays_janitor::{CollectingSink, Invocation, Janitor, Outcome};
/// use keepdays_store::MemoryBucket;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = MemoryBucket::new();
/// store.add_object("archive", "2023-01-01/00-00-00_documents.tar");
///
/// let mut janitor = Janitor::default_config();
/// let mut sink = CollectingSink::default();
/// let payload = Invocation::object_created("archive", "2023-01-01/00-00-00_documents.tar");
///
/// let outcome = janitor.handle(&payload, &mut store, &mut sink)?;
/// assert!(matches!(outcome, Outcome::Tagged { .. }));
/// let tag = store.tag("archive", "2023-01-01/00-00-00_documents.tar", "keep-days");
/// assert_eq!(tag, Some("1095"));
/// # Ok(())
/// # }
/// ```
pub struct Janitor {
    config: JanitorConfig,
    metrics: JanitorMetrics,
}

impl Janitor {
    /// Create a new Janitor with the given configuration
    pub fn new(config: JanitorConfig) -> Self {
        Self {
            config,
            metrics: JanitorMetrics::new(),
        }
    }

    /// Create a Janitor with default configuration
    pub fn default_config() -> Self {
        Self::new(JanitorConfig::default())
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Handle one invocation payload
    ///
    /// Upload notifications tag each new archive; scheduled triggers reconcile
    /// the configured archive bucket. Payloads of any other shape are logged
    /// and ignored. Staged metrics are posted at the end unless the payload is
    /// marked `testmode`.
    pub fn handle<S, M>(
        &mut self,
        payload: &Value,
        store: &mut S,
        sink: &mut M,
    ) -> Result<Outcome, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
        M: MetricsSink,
        M::Error: Display,
    {
        match Invocation::from_json(payload) {
            Ok(invocation) => self.handle_invocation(&invocation, store, sink),
            Err(e) => {
                tracing::warn!("{}; ignoring payload {}", e, payload);
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Handle an already decoded invocation
    pub fn handle_invocation<S, M>(
        &mut self,
        invocation: &Invocation,
        store: &mut S,
        sink: &mut M,
    ) -> Result<Outcome, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
        M: MetricsSink,
        M::Error: Display,
    {
        if invocation.test_mode {
            tracing::debug!("Test mode: metrics will not be posted");
        }
        let mut staged = MetricManager::new(self.config.metric_namespace.clone());

        let result = self.dispatch(invocation, store, &mut staged);
        staged.post_metrics(sink, invocation.test_mode);
        result
    }

    fn dispatch<S>(
        &mut self,
        invocation: &Invocation,
        store: &mut S,
        staged: &mut MetricManager,
    ) -> Result<Outcome, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        if invocation.events.contains(&Event::Scheduled) {
            tracing::info!("Processing scheduled event");
            let bucket = self.config.archive_bucket.clone();
            let report = self.reconcile(store, &bucket, staged)?;
            return Ok(Outcome::Reconciled { report });
        }

        // Uploads grouped by bucket, keys in notification order
        let mut uploads: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for event in &invocation.events {
            if let Event::ObjectCreated { bucket, key } = event {
                uploads.entry(bucket.as_str()).or_default().push(key.as_str());
            }
        }

        let mut archives = Vec::new();
        for (bucket, keys) in uploads {
            tracing::info!("Processing new upload event for {} key(s) in {}", keys.len(), bucket);
            archives.extend(self.tag_uploads(store, bucket, &keys, staged)?);
        }
        Ok(Outcome::Tagged { archives })
    }

    /// Tag one newly uploaded archive and stage its counter metric
    ///
    /// The archive is classified against every archive already in its group.
    pub fn tag_new_archive<S>(
        &mut self,
        store: &mut S,
        bucket: &str,
        key: &str,
        staged: &mut MetricManager,
    ) -> Result<TaggedArchive, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let mut tagged = self.tag_uploads(store, bucket, &[key], staged)?;
        tagged.pop().ok_or_else(|| JanitorError::UnknownArchive {
            key: key.to_string(),
            group: String::new(),
        })
    }

    fn tag_uploads<S>(
        &mut self,
        store: &mut S,
        bucket: &str,
        keys: &[&str],
        staged: &mut MetricManager,
    ) -> Result<Vec<TaggedArchive>, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let mut bucket = ArchiveBucket::new(store, bucket, self.config.tag_key.as_str())
            .with_dry_run(self.config.dry_run);
        let mut collections: BTreeMap<String, ArchiveCollection> = BTreeMap::new();
        let mut tagged = Vec::with_capacity(keys.len());

        for key in keys {
            let archive = ArchiveKey::parse(key)?;
            let group = archive.archive_group().to_string();

            let collection = match collections.entry(group.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(ArchiveCollection::load(&mut bucket, &group)?),
            };
            // The listing may predate the upload
            collection.include(archive)?;

            let result = collection.tag_new_archive(&mut bucket, key, &self.config.retention)?;
            if result.written {
                self.metrics.record_tag(result.tier);
            }
            staged.add_metric(
                &format!("TaggedNewArchive_{}", group),
                "TaggedNewArchive",
                1.0,
                MetricUnit::None,
                vec![Dimension::new("ArchiveGroup", group.as_str())],
            );
            tagged.push(result);
        }

        Ok(tagged)
    }

    /// Reconcile every archive group in `bucket`
    ///
    /// Missing or too-low tags are raised to the expected keep-days; larger
    /// values are left alone. Stages a `FixedTags` count metric.
    pub fn reconcile<S>(
        &mut self,
        store: &mut S,
        bucket: &str,
        staged: &mut MetricManager,
    ) -> Result<ReconcileReport, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let start = Instant::now();
        let mut archive_bucket = ArchiveBucket::new(store, bucket, self.config.tag_key.as_str())
            .with_dry_run(self.config.dry_run);

        let mut report = ReconcileReport {
            bucket: bucket.to_string(),
            malformed: archive_bucket.malformed_keys()?,
            ..Default::default()
        };
        for _ in &report.malformed {
            self.metrics.record_skip();
        }

        for group in archive_bucket.archive_groups()? {
            tracing::debug!("Reconciling archive group {}", group);
            let mut collection = ArchiveCollection::load(&mut archive_bucket, &group)?;
            let group_report = collection.fix_tags(
                &mut archive_bucket,
                &self.config.retention,
                &mut self.metrics,
            )?;
            report.groups.push(group_report);
        }

        let fixed = report.total_corrected();
        tracing::info!(
            "Reconciled {} archives in {} groups of bucket {}: {} tags fixed, {} keys skipped",
            report.total_checked(),
            report.groups.len(),
            bucket,
            fixed,
            report.total_skipped()
        );
        staged.add_metric("FixedTags", "FixedTags", fixed as f64, MetricUnit::Count, Vec::new());

        self.metrics.record_sweep();
        self.metrics.total_runtime_secs += start.elapsed().as_secs();

        Ok(report)
    }

    /// Reconcile the configured archive bucket and post the resulting metrics
    pub fn run_scheduled<S, M>(
        &mut self,
        store: &mut S,
        sink: &mut M,
    ) -> Result<ReconcileReport, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
        M: MetricsSink,
        M::Error: Display,
    {
        let mut staged = MetricManager::new(self.config.metric_namespace.clone());
        let bucket = self.config.archive_bucket.clone();
        let result = self.reconcile(store, &bucket, &mut staged);
        staged.post_metrics(sink, false);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectingSink;
    use keepdays_domain::Tier;
    use keepdays_store::MemoryBucket;
    use serde_json::json;

    const BUCKET: &str = "com.mysite.myarchive.bucket";
    const TAG: &str = "keep-days";

    #[test]
    fn test_upload_tags_and_emits_group_metric() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");
        store.add_object(BUCKET, "2023-01-01/12-00-00_documents.tar");

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let payload = Invocation::object_created(BUCKET, "2023-01-01/12-00-00_documents.tar");
        let outcome = janitor.handle(&payload, &mut store, &mut sink).unwrap();

        match outcome {
            Outcome::Tagged { archives } => {
                assert_eq!(archives.len(), 1);
                assert_eq!(archives[0].tier, Tier::ORDINARY);
                assert_eq!(archives[0].keep_days, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(store.tag(BUCKET, "2023-01-01/12-00-00_documents.tar", TAG), Some("3"));
        // Only the uploaded key is written
        assert_eq!(store.tag_writes().len(), 1);

        let data = sink.datums("TaggedNewArchive");
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].value, 1.0);
        assert_eq!(data[0].dimensions, vec![Dimension::new("ArchiveGroup", "documents")]);
        assert_eq!(sink.batches[0].0, "SimpleS3BackupManager");
        assert_eq!(janitor.metrics().total_tagged(), 1);
    }

    #[test]
    fn test_upload_missing_from_listing_is_still_classified() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_db.sql");

        let mut janitor = Janitor::default_config();
        let mut staged = MetricManager::new("ns");
        let err = janitor
            .tag_new_archive(&mut store, BUCKET, "2023-02-01/00-00-00_db.sql", &mut staged)
            .unwrap_err();
        // Classified as monthly; the write fails because the object is absent
        assert!(matches!(err, JanitorError::Store { operation: "put_tag", .. }));
    }

    #[test]
    fn test_upload_with_unparseable_key_fails() {
        let mut store = MemoryBucket::new();
        let mut janitor = Janitor::default_config();
        let mut staged = MetricManager::new("ns");
        let err = janitor
            .tag_new_archive(&mut store, BUCKET, "notes.txt", &mut staged)
            .unwrap_err();
        assert!(matches!(err, JanitorError::Parse(_)));
        assert!(staged.is_empty());
    }

    #[test]
    fn test_scheduled_reconciles_configured_bucket() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");
        store.add_tagged_object(BUCKET, "2023-01-02/00-00-00_documents.tar", TAG, "99");
        store.add_object(BUCKET, "2023-01-01/00-00-00_photos.zip");
        store.add_object(BUCKET, "README");
        store.add_object("elsewhere", "2023-01-01/00-00-00_documents.tar");

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let outcome = janitor
            .handle(&Invocation::scheduled(), &mut store, &mut sink)
            .unwrap();

        let report = match outcome {
            Outcome::Reconciled { report } => report,
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(report.groups.len(), 2);
        assert_eq!(report.total_corrected(), 2);
        assert_eq!(report.malformed, vec!["README".to_string()]);

        assert_eq!(store.tag(BUCKET, "2023-01-01/00-00-00_documents.tar", TAG), Some("1095"));
        assert_eq!(store.tag(BUCKET, "2023-01-02/00-00-00_documents.tar", TAG), Some("99"));
        assert_eq!(store.tag(BUCKET, "2023-01-01/00-00-00_photos.zip", TAG), Some("3650"));
        assert_eq!(store.tag("elsewhere", "2023-01-01/00-00-00_documents.tar", TAG), None);

        let fixed = sink.datums("FixedTags");
        assert_eq!(fixed.len(), 1);
        assert_eq!(fixed[0].value, 2.0);
        assert_eq!(fixed[0].unit, MetricUnit::Count);
        assert_eq!(janitor.metrics().sweep_count, 1);
        assert_eq!(janitor.metrics().skipped, 1);
    }

    #[test]
    fn test_testmode_suppresses_metrics() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let payload = json!({"source": "aws.events", "testmode": 1});
        janitor.handle(&payload, &mut store, &mut sink).unwrap();

        assert!(sink.batches.is_empty());
        assert_eq!(store.tag(BUCKET, "2023-01-01/00-00-00_documents.tar", TAG), Some("1095"));
    }

    #[test]
    fn test_null_testmode_suppresses_metrics() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let payload = json!({"source": "aws.events", "testmode": null});
        let outcome = janitor.handle(&payload, &mut store, &mut sink).unwrap();

        assert!(matches!(outcome, Outcome::Reconciled { .. }));
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn test_unrecognized_payload_is_ignored() {
        let mut store = MemoryBucket::new();
        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();

        let outcome = janitor
            .handle(&json!({"source": "aws.s3"}), &mut store, &mut sink)
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert_eq!(store.list_calls(), 0);
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");

        let config = JanitorConfig {
            dry_run: true,
            ..Default::default()
        };
        let mut janitor = Janitor::new(config);
        let mut sink = CollectingSink::default();
        let report = janitor.run_scheduled(&mut store, &mut sink).unwrap();

        assert_eq!(report.total_corrected(), 1);
        assert!(store.tag_writes().is_empty());
        assert_eq!(janitor.metrics().total_tagged(), 0);
    }

    #[test]
    fn test_listing_failure_aborts_the_run() {
        let mut store = MemoryBucket::new();
        store.fail_listing(true);

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let result = janitor.run_scheduled(&mut store, &mut sink);

        assert!(matches!(result, Err(JanitorError::Store { operation: "list_objects", .. })));
        assert_eq!(janitor.metrics().sweep_count, 0);
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn test_reset_metrics() {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");
        let mut janitor = Janitor::default_config();
        janitor.run_scheduled(&mut store, &mut CollectingSink::default()).unwrap();
        assert_eq!(janitor.metrics().sweep_count, 1);

        janitor.reset_metrics();
        assert_eq!(janitor.metrics().sweep_count, 0);
        assert_eq!(janitor.metrics().total_tagged(), 0);
    }
}
