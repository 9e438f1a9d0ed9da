//! All archives of one archive group, with their tiers

use crate::bucket::ArchiveBucket;
use crate::{JanitorError, JanitorMetrics};
use chrono::NaiveDateTime;
use keepdays_domain::traits::ArchiveStore;
use keepdays_domain::{ArchiveKey, RetentionPolicy, Tier, TierClassifier};
use serde::Serialize;
use std::fmt::Display;

/// Result of tagging one archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedArchive {
    /// Object key
    pub key: String,
    /// Archive group
    pub archive_group: String,
    /// Assigned tier
    pub tier: Tier,
    /// Keep-days value for the tier
    pub keep_days: u32,
    /// Whether the tag was actually written (false in dry-run mode)
    pub written: bool,
}

/// Outcome of reconciling one archive group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupReport {
    /// Archive group
    pub archive_group: String,
    /// Archives examined
    pub checked: usize,
    /// Tags written or (in dry-run mode) that would have been written
    pub corrected: usize,
    /// Keys with no retention entry for their tier
    pub skipped: Vec<String>,
}

/// The archives of one group and their (lazily computed) tier map
///
/// Tiers are computed once per collection from the full archive set and
/// reused for every lookup. A collection lives no longer than the invocation
/// that built it.
#[derive(Debug, Clone)]
pub struct ArchiveCollection {
    archive_group: String,
    archives: Vec<ArchiveKey>,
    classifier: Option<TierClassifier>,
}

impl ArchiveCollection {
    /// Build a collection from archives already known to belong to `group`
    pub fn new(archive_group: impl Into<String>, archives: Vec<ArchiveKey>) -> Self {
        let archive_group = archive_group.into();
        let archives = archives
            .into_iter()
            .filter(|archive| archive.archive_group() == archive_group)
            .collect();
        Self {
            archive_group,
            archives,
            classifier: None,
        }
    }

    /// Build a collection from a bucket's listing
    pub fn load<S>(
        bucket: &mut ArchiveBucket<'_, S>,
        archive_group: &str,
    ) -> Result<Self, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let archives = bucket.archives_in_group(archive_group)?;
        Ok(Self::new(archive_group, archives))
    }

    /// Archive group name
    pub fn archive_group(&self) -> &str {
        &self.archive_group
    }

    /// Archives in the collection
    pub fn archives(&self) -> &[ArchiveKey] {
        &self.archives
    }

    /// Add an archive if it is not already present
    ///
    /// Used when a freshly uploaded key has not yet shown up in the listing.
    pub fn include(&mut self, archive: ArchiveKey) -> Result<(), JanitorError> {
        if archive.archive_group() != self.archive_group {
            return Err(JanitorError::UnknownArchive {
                key: archive.into_string(),
                group: self.archive_group.clone(),
            });
        }
        if !self.archives.iter().any(|a| a.as_str() == archive.as_str()) {
            self.archives.push(archive);
            self.classifier = None;
        }
        Ok(())
    }

    fn classifier(&mut self) -> &TierClassifier {
        self.classifier
            .get_or_insert_with(|| TierClassifier::from_archives(&self.archives))
    }

    /// Tier of an archive in this collection
    pub fn determine_archive_tier(&mut self, key: &str) -> Result<Tier, JanitorError> {
        let group = self.archive_group.clone();
        self.classifier()
            .tier_of(key)
            .ok_or_else(|| JanitorError::UnknownArchive {
                key: key.to_string(),
                group,
            })
    }

    /// Keep-days for an archive in this collection
    pub fn determine_archive_retention(
        &mut self,
        key: &str,
        policy: &RetentionPolicy,
    ) -> Result<(Tier, u32), JanitorError> {
        let tier = self.determine_archive_tier(key)?;
        let days = policy.retention_days(&self.archive_group, tier)?;
        Ok((tier, days))
    }

    /// Tier an archive at `timestamp` would get after every archive in the
    /// collection, without adding it
    pub fn determine_date_archive_tier(&mut self, timestamp: &NaiveDateTime) -> Tier {
        self.classifier().tier_for_timestamp(timestamp)
    }

    /// Tag a newly uploaded archive
    pub fn tag_new_archive<S>(
        &mut self,
        bucket: &mut ArchiveBucket<'_, S>,
        key: &str,
        policy: &RetentionPolicy,
    ) -> Result<TaggedArchive, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let (tier, keep_days) = self.determine_archive_retention(key, policy)?;
        tracing::info!(
            "Archive {} is tier {} and will be retained {} days",
            key,
            tier,
            keep_days
        );
        let written = bucket.apply_archival_tag(key, keep_days)?;
        Ok(TaggedArchive {
            key: key.to_string(),
            archive_group: self.archive_group.clone(),
            tier,
            keep_days,
            written,
        })
    }

    /// Raise every missing or too-low tag in the collection
    ///
    /// Existing tags at or above the expected value are left alone. Archives
    /// whose tier has no retention entry are logged and skipped; a failed tag
    /// write aborts the run.
    pub fn fix_tags<S>(
        &mut self,
        bucket: &mut ArchiveBucket<'_, S>,
        policy: &RetentionPolicy,
        metrics: &mut JanitorMetrics,
    ) -> Result<GroupReport, JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
    {
        let mut report = GroupReport {
            archive_group: self.archive_group.clone(),
            ..Default::default()
        };
        let keys: Vec<String> = self.archives.iter().map(|a| a.as_str().to_string()).collect();

        for key in keys {
            report.checked += 1;
            let (tier, expected) = match self.determine_archive_retention(&key, policy) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", key, e);
                    metrics.record_skip();
                    report.skipped.push(key);
                    continue;
                }
            };
            let current = bucket.get_archival_tag(&key);
            tracing::info!(
                "Found {} with current retention tag of {:?} and expected tag of {}",
                key,
                current,
                expected
            );

            if current.is_none_or(|days| days < expected) {
                if bucket.apply_archival_tag(&key, expected)? {
                    metrics.record_tag(tier);
                }
                metrics.record_correction(&self.archive_group);
                report.corrected += 1;
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use keepdays_domain::RetentionTable;
    use keepdays_store::MemoryBucket;

    const BUCKET: &str = "archive";
    const TAG: &str = "keep-days";

    fn archives(raw: &[&str]) -> Vec<ArchiveKey> {
        raw.iter().map(|k| ArchiveKey::parse(k).unwrap()).collect()
    }

    fn store_with(keys: &[&str]) -> MemoryBucket {
        let mut store = MemoryBucket::new();
        for key in keys {
            store.add_object(BUCKET, key);
        }
        store
    }

    #[test]
    fn test_new_filters_other_groups() {
        let collection = ArchiveCollection::new(
            "documents",
            archives(&["2023-01-01/00-00-00_documents.tar", "2023-01-01/00-00-00_photos.zip"]),
        );
        assert_eq!(collection.archives().len(), 1);
    }

    #[test]
    fn test_retention_by_tier() {
        let mut collection = ArchiveCollection::new(
            "documents",
            archives(&[
                "2023-04-01/00-00-01_documents.tar",
                "2023-01-01/00-00-00_documents.tar",
                "2023-04-01/00-00-00_documents.tar",
            ]),
        );
        let policy = RetentionPolicy::default();
        assert_eq!(
            collection
                .determine_archive_retention("2023-01-01/00-00-00_documents.tar", &policy)
                .unwrap(),
            (Tier::YEARLY, 1095)
        );
        assert_eq!(
            collection
                .determine_archive_retention("2023-04-01/00-00-00_documents.tar", &policy)
                .unwrap(),
            (Tier::QUARTERLY, 365)
        );
        assert_eq!(
            collection
                .determine_archive_retention("2023-04-01/00-00-01_documents.tar", &policy)
                .unwrap(),
            (Tier::ORDINARY, 3)
        );
        assert!(matches!(
            collection.determine_archive_tier("2024-01-01/00-00-00_documents.tar"),
            Err(JanitorError::UnknownArchive { .. })
        ));
    }

    #[test]
    fn test_include_reclassifies() {
        let mut collection =
            ArchiveCollection::new("db", archives(&["2023-06-01/00-00-00_db.sql"]));
        assert_eq!(
            collection.determine_archive_tier("2023-06-01/00-00-00_db.sql").unwrap(),
            Tier::YEARLY
        );

        // An earlier archive appears: it takes over the yearly slot
        collection
            .include(ArchiveKey::parse("2023-02-01/00-00-00_db.sql").unwrap())
            .unwrap();
        assert_eq!(
            collection.determine_archive_tier("2023-06-01/00-00-00_db.sql").unwrap(),
            Tier::QUARTERLY
        );
        assert!(collection
            .include(ArchiveKey::parse("2023-02-01/00-00-00_other.sql").unwrap())
            .is_err());
    }

    #[test]
    fn test_date_tier_is_read_only() {
        let mut collection = ArchiveCollection::new(
            "db",
            archives(&["2023-06-01/00-00-00_db.sql", "2023-06-02/00-00-00_db.sql"]),
        );
        let probe = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap().and_hms_opt(5, 0, 0).unwrap();
        assert_eq!(collection.determine_date_archive_tier(&probe), Tier::ORDINARY);
        assert_eq!(collection.determine_date_archive_tier(&probe), Tier::ORDINARY);
        assert_eq!(
            collection.determine_archive_tier("2023-06-02/00-00-00_db.sql").unwrap(),
            Tier::DAILY
        );
    }

    #[test]
    fn test_fix_tags_only_raises() {
        let keys = [
            "2023-01-01/00-00-00_documents.tar", // yearly: 1095
            "2023-01-01/06-00-00_documents.tar", // ordinary: 3
            "2023-01-02/00-00-00_documents.tar", // weekly (new ISO week): 30
        ];
        let mut store = store_with(&[]);
        store.add_tagged_object(BUCKET, keys[0], TAG, "10");
        store.add_tagged_object(BUCKET, keys[1], TAG, "500");
        store.add_object(BUCKET, keys[2]);

        let mut metrics = JanitorMetrics::new();
        let report = {
            let mut bucket = ArchiveBucket::new(&mut store, BUCKET, TAG);
            let mut collection = ArchiveCollection::load(&mut bucket, "documents").unwrap();
            collection
                .fix_tags(&mut bucket, &RetentionPolicy::default(), &mut metrics)
                .unwrap()
        };

        assert_eq!(report.checked, 3);
        assert_eq!(report.corrected, 2);
        assert_eq!(store.tag(BUCKET, keys[0], TAG), Some("1095"));
        assert_eq!(store.tag(BUCKET, keys[1], TAG), Some("500"));
        assert_eq!(store.tag(BUCKET, keys[2], TAG), Some("30"));
        assert_eq!(metrics.total_corrected(), 2);
        assert_eq!(metrics.tagged.get(&Tier::WEEKLY), Some(&1));
    }

    #[test]
    fn test_fix_tags_skips_keys_outside_short_table() {
        let keys = [
            "2023-01-01/00-00-00_logs.tar",
            "2023-01-01/00-00-01_logs.tar",
        ];
        let mut store = store_with(&keys);
        let mut policy = RetentionPolicy::default();
        policy.set_group("logs", RetentionTable::new(vec![60, 30]));

        let mut metrics = JanitorMetrics::new();
        let report = {
            let mut bucket = ArchiveBucket::new(&mut store, BUCKET, TAG);
            let mut collection = ArchiveCollection::load(&mut bucket, "logs").unwrap();
            collection.fix_tags(&mut bucket, &policy, &mut metrics).unwrap()
        };

        assert_eq!(report.corrected, 1);
        assert_eq!(report.skipped, vec![keys[1].to_string()]);
        assert_eq!(metrics.skipped, 1);
        assert_eq!(store.tag(BUCKET, keys[0], TAG), Some("60"));
        assert_eq!(store.tag(BUCKET, keys[1], TAG), None);
    }

    #[test]
    fn test_fix_tags_aborts_on_write_failure() {
        let mut store = store_with(&["2023-01-01/00-00-00_logs.tar"]);
        store.fail_tag_writes(true);

        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, TAG);
        let mut collection = ArchiveCollection::load(&mut bucket, "logs").unwrap();
        let result = collection.fix_tags(
            &mut bucket,
            &RetentionPolicy::default(),
            &mut JanitorMetrics::new(),
        );
        assert!(matches!(result, Err(JanitorError::Store { .. })));
    }

    #[test]
    fn test_tag_new_archive() {
        let keys = ["2023-01-01/00-00-00_photos.zip", "2023-02-01/00-00-00_photos.zip"];
        let mut store = store_with(&keys);

        let tagged = {
            let mut bucket = ArchiveBucket::new(&mut store, BUCKET, TAG);
            let mut collection = ArchiveCollection::load(&mut bucket, "photos").unwrap();
            collection
                .tag_new_archive(&mut bucket, keys[1], &RetentionPolicy::default())
                .unwrap()
        };

        assert_eq!(tagged.tier, Tier::MONTHLY);
        assert_eq!(tagged.keep_days, 365);
        assert!(tagged.written);
        assert_eq!(store.tag(BUCKET, keys[1], TAG), Some("365"));
        assert_eq!(store.tag(BUCKET, keys[0], TAG), None);
    }
}
