//! Per-invocation view of one bucket
//!
//! An [`ArchiveBucket`] wraps a store for the duration of one invocation. It
//! lists the bucket at most once and parses every key up front; the cached
//! listing is dropped with the bucket, so a later invocation always sees the
//! bucket's current contents.

use crate::JanitorError;
use keepdays_domain::traits::ArchiveStore;
use keepdays_domain::{ArchiveKey, ParseError};
use std::collections::BTreeSet;
use std::fmt::Display;

#[derive(Debug, Default)]
struct Listing {
    archives: Vec<ArchiveKey>,
    malformed: Vec<(String, ParseError)>,
}

/// One bucket's archives and keep-days tags, cached for one invocation
pub struct ArchiveBucket<'s, S> {
    store: &'s mut S,
    name: String,
    tag_key: String,
    dry_run: bool,
    listing: Option<Listing>,
}

impl<'s, S> ArchiveBucket<'s, S>
where
    S: ArchiveStore,
    S::Error: Display,
{
    /// Wrap `store` for bucket `name`, reading and writing tag `tag_key`
    pub fn new(store: &'s mut S, name: impl Into<String>, tag_key: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            tag_key: tag_key.into(),
            dry_run: false,
            listing: None,
        }
    }

    /// Log tag writes instead of performing them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    fn listing(&mut self) -> Result<&Listing, JanitorError> {
        if self.listing.is_none() {
            tracing::debug!("Getting object list from bucket {}", self.name);
            let objects = self.store.list_objects(&self.name).map_err(|e| {
                tracing::error!("Error fetching object listing for bucket {}: {}", self.name, e);
                JanitorError::Store {
                    operation: "list_objects",
                    bucket: self.name.clone(),
                    key: String::new(),
                    message: e.to_string(),
                }
            })?;

            let mut listing = Listing::default();
            for object in objects {
                match ArchiveKey::parse(&object.key) {
                    Ok(archive) => listing.archives.push(archive),
                    Err(e) => {
                        tracing::warn!(
                            "Skipping object {} in bucket {}: {}",
                            object.key,
                            self.name,
                            e
                        );
                        listing.malformed.push((object.key, e));
                    }
                }
            }
            listing.archives.sort();
            self.listing = Some(listing);
        }
        Ok(self.listing.get_or_insert_with(Listing::default))
    }

    /// Every parseable archive in the bucket, chronologically
    pub fn archives(&mut self) -> Result<&[ArchiveKey], JanitorError> {
        Ok(&self.listing()?.archives)
    }

    /// Keys in the bucket that are not archive keys
    pub fn malformed_keys(&mut self) -> Result<Vec<String>, JanitorError> {
        Ok(self
            .listing()?
            .malformed
            .iter()
            .map(|(key, _)| key.clone())
            .collect())
    }

    /// Distinct archive group names, sorted
    pub fn archive_groups(&mut self) -> Result<Vec<String>, JanitorError> {
        let groups: BTreeSet<&str> = self
            .listing()?
            .archives
            .iter()
            .map(ArchiveKey::archive_group)
            .collect();
        Ok(groups.into_iter().map(str::to_string).collect())
    }

    /// Archives belonging to `group`, chronologically
    pub fn archives_in_group(&mut self, group: &str) -> Result<Vec<ArchiveKey>, JanitorError> {
        Ok(self
            .listing()?
            .archives
            .iter()
            .filter(|archive| archive.archive_group() == group)
            .cloned()
            .collect())
    }

    /// Current keep-days value of an archive
    ///
    /// Read failures and non-numeric values are logged and reported as no tag.
    pub fn get_archival_tag(&self, key: &str) -> Option<u32> {
        tracing::debug!("Getting archival tag for object s3://{}/{}", self.name, key);
        let value = match self.store.get_tag(&self.name, key, &self.tag_key) {
            Ok(value) => value?,
            Err(e) => {
                tracing::warn!(
                    "Error fetching archival tag ({}) from key {} in bucket {}: {}",
                    self.tag_key,
                    key,
                    self.name,
                    e
                );
                return None;
            }
        };
        match value.trim().parse() {
            Ok(days) => Some(days),
            Err(_) => {
                tracing::warn!(
                    "Ignoring non-numeric {} tag '{}' on s3://{}/{}",
                    self.tag_key,
                    value,
                    self.name,
                    key
                );
                None
            }
        }
    }

    /// Set an archive's keep-days value
    ///
    /// Returns whether a write was issued (`false` in dry-run mode).
    pub fn apply_archival_tag(&mut self, key: &str, days: u32) -> Result<bool, JanitorError> {
        if self.dry_run {
            tracing::info!(
                "DRY RUN: Would apply tag {}:{} to {} in bucket {}",
                self.tag_key,
                days,
                key,
                self.name
            );
            return Ok(false);
        }

        tracing::info!(
            "Applying tag {}:{} to {} in bucket {}",
            self.tag_key,
            days,
            key,
            self.name
        );
        self.store
            .put_tag(&self.name, key, &self.tag_key, &days.to_string())
            .map_err(|e| {
                tracing::error!(
                    "Error applying archival tag ({}) of {} to key {} in bucket {}: {}",
                    self.tag_key,
                    days,
                    key,
                    self.name,
                    e
                );
                JanitorError::Store {
                    operation: "put_tag",
                    bucket: self.name.clone(),
                    key: key.to_string(),
                    message: e.to_string(),
                }
            })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keepdays_store::MemoryBucket;

    const BUCKET: &str = "archive";

    fn store_with(keys: &[&str]) -> MemoryBucket {
        let mut store = MemoryBucket::new();
        for key in keys {
            store.add_object(BUCKET, key);
        }
        store
    }

    #[test]
    fn test_listing_is_cached_per_bucket_instance() {
        let mut store = store_with(&["2023-01-01/00-00-00_documents.tar"]);
        {
            let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
            bucket.archives().unwrap();
            bucket.archive_groups().unwrap();
            bucket.archives_in_group("documents").unwrap();
        }
        assert_eq!(store.list_calls(), 1);

        // A new invocation lists again and sees new objects
        store.add_object(BUCKET, "2023-01-02/00-00-00_photos.zip");
        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        assert_eq!(bucket.archive_groups().unwrap(), vec!["documents", "photos"]);
        drop(bucket);
        assert_eq!(store.list_calls(), 2);
    }

    #[test]
    fn test_malformed_keys_are_set_aside() {
        let mut store = store_with(&[
            "2023-01-01/00-00-00_documents.tar",
            "README.txt",
            "2023-13-01/00-00-00_documents.tar",
        ]);
        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        assert_eq!(bucket.archives().unwrap().len(), 1);
        assert_eq!(
            bucket.malformed_keys().unwrap(),
            vec!["2023-13-01/00-00-00_documents.tar", "README.txt"]
        );
    }

    #[test]
    fn test_listing_failure_is_a_store_error() {
        let mut store = MemoryBucket::new();
        store.fail_listing(true);
        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        assert!(matches!(
            bucket.archives(),
            Err(JanitorError::Store { operation: "list_objects", .. })
        ));
    }

    #[test]
    fn test_tag_read_failures_read_as_absent() {
        let mut store = MemoryBucket::new();
        store.add_tagged_object(BUCKET, "a", "keep-days", "30");
        store.add_tagged_object(BUCKET, "b", "keep-days", "lots");
        store.add_tagged_object(BUCKET, "c", "keep-days", "30");
        store.make_tags_unreadable("c");

        let bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        assert_eq!(bucket.get_archival_tag("a"), Some(30));
        assert_eq!(bucket.get_archival_tag("b"), None);
        assert_eq!(bucket.get_archival_tag("c"), None);
        assert_eq!(bucket.get_archival_tag("missing"), None);
    }

    #[test]
    fn test_apply_and_dry_run() {
        let mut store = store_with(&["k"]);
        {
            let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days").with_dry_run(true);
            assert!(!bucket.apply_archival_tag("k", 30).unwrap());
        }
        assert!(store.tag_writes().is_empty());

        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        assert!(bucket.apply_archival_tag("k", 30).unwrap());
        drop(bucket);
        assert_eq!(store.tag(BUCKET, "k", "keep-days"), Some("30"));
    }

    #[test]
    fn test_write_failure_is_a_store_error() {
        let mut store = store_with(&["k"]);
        store.fail_tag_writes(true);
        let mut bucket = ArchiveBucket::new(&mut store, BUCKET, "keep-days");
        let err = bucket.apply_archival_tag("k", 30).unwrap_err();
        assert!(matches!(err, JanitorError::Store { operation: "put_tag", .. }));
    }
}
