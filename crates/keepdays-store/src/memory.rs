//! In-process bucket

use crate::StoreError;
use keepdays_domain::traits::{ArchiveStore, ObjectEntry};
use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};

type TagSet = BTreeMap<String, String>;

/// In-memory implementation of ArchiveStore
///
/// Besides holding objects and tags, it counts listing calls and tag writes
/// and can be told to fail specific operations, so callers' error handling
/// can be exercised.
#[derive(Debug, Default)]
pub struct MemoryBucket {
    buckets: BTreeMap<String, BTreeMap<String, TagSet>>,
    list_calls: Cell<usize>,
    tag_writes: Vec<(String, String, String)>,
    fail_listing: bool,
    fail_tag_writes: bool,
    unreadable_tags: BTreeSet<String>,
}

impl MemoryBucket {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an untagged object (no-op if it already exists)
    pub fn add_object(&mut self, bucket: &str, key: &str) {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default();
    }

    /// Add an object carrying a single tag
    pub fn add_tagged_object(&mut self, bucket: &str, key: &str, tag: &str, value: &str) {
        self.add_object(bucket, key);
        if let Some(tags) = self.tags_mut(bucket, key) {
            tags.insert(tag.to_string(), value.to_string());
        }
    }

    /// Current tag value without going through the trait
    pub fn tag(&self, bucket: &str, key: &str, tag: &str) -> Option<&str> {
        self.buckets
            .get(bucket)?
            .get(key)?
            .get(tag)
            .map(String::as_str)
    }

    /// How many times `list_objects` has been called
    pub fn list_calls(&self) -> usize {
        self.list_calls.get()
    }

    /// Every successful tag write as `(key, tag, value)`, in order
    pub fn tag_writes(&self) -> &[(String, String, String)] {
        &self.tag_writes
    }

    /// Make `list_objects` fail
    pub fn fail_listing(&mut self, fail: bool) {
        self.fail_listing = fail;
    }

    /// Make `put_tag` fail
    pub fn fail_tag_writes(&mut self, fail: bool) {
        self.fail_tag_writes = fail;
    }

    /// Make `get_tag` fail for one key
    pub fn make_tags_unreadable(&mut self, key: &str) {
        self.unreadable_tags.insert(key.to_string());
    }

    fn tags_mut(&mut self, bucket: &str, key: &str) -> Option<&mut TagSet> {
        self.buckets.get_mut(bucket)?.get_mut(key)
    }
}

impl ArchiveStore for MemoryBucket {
    type Error = StoreError;

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>, Self::Error> {
        self.list_calls.set(self.list_calls.get() + 1);
        if self.fail_listing {
            return Err(StoreError::Unavailable(format!("listing of {} refused", bucket)));
        }
        Ok(self
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().map(ObjectEntry::new).collect())
            .unwrap_or_default())
    }

    fn get_tag(&self, bucket: &str, key: &str, tag: &str) -> Result<Option<String>, Self::Error> {
        if self.unreadable_tags.contains(key) {
            return Err(StoreError::Unavailable(format!("tags of {} unreadable", key)));
        }
        let tags = self
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        Ok(tags.get(tag).cloned())
    }

    fn put_tag(
        &mut self,
        bucket: &str,
        key: &str,
        tag: &str,
        value: &str,
    ) -> Result<(), Self::Error> {
        if self.fail_tag_writes {
            return Err(StoreError::Unavailable(format!("tag write to {} refused", key)));
        }
        let tags = self.tags_mut(bucket, key).ok_or_else(|| StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })?;
        tags.clear();
        tags.insert(tag.to_string(), value.to_string());
        self.tag_writes
            .push((key.to_string(), tag.to_string(), value.to_string()));
        Ok(())
    }
}
