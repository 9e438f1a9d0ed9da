//! End-to-end reconciliation and upload tagging
//!
//! Runs the Janitor against in-memory and SQLite-backed buckets.

use keepdays_domain::traits::{ArchiveStore, ObjectEntry};
use keepdays_domain::{RetentionTable, Tier};
use keepdays_janitor::{CollectingSink, Invocation, Janitor, JanitorConfig, JanitorError, Outcome};
use keepdays_store::{MemoryBucket, SqliteBucket, StoreError};
use tempfile::TempDir;

const BUCKET: &str = "com.mysite.myarchive.bucket";
const TAG: &str = "keep-days";

/// A month of nightly documents backups with a few extra runs
const DOCUMENTS: &[&str] = &[
    "2023-12-31/23-00-00_documents.tar",
    "2024-01-01/01-00-00_documents.tar",
    "2024-01-01/13-00-00_documents.tar",
    "2024-01-02/01-00-00_documents.tar",
    "2024-01-08/01-00-00_documents.tar",
    "2024-01-09/01-00-00_documents.tar",
    "2024-02-01/01-00-00_documents.tar",
    "2024-04-01/01-00-00_documents.tar",
];

/// Lists objects newest first
struct ReversedListing(MemoryBucket);

impl ArchiveStore for ReversedListing {
    type Error = StoreError;

    fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>, Self::Error> {
        let mut objects = self.0.list_objects(bucket)?;
        objects.reverse();
        Ok(objects)
    }

    fn get_tag(&self, bucket: &str, key: &str, tag: &str) -> Result<Option<String>, Self::Error> {
        self.0.get_tag(bucket, key, tag)
    }

    fn put_tag(
        &mut self,
        bucket: &str,
        key: &str,
        tag: &str,
        value: &str,
    ) -> Result<(), Self::Error> {
        self.0.put_tag(bucket, key, tag, value)
    }
}

fn documents_bucket() -> MemoryBucket {
    let mut store = MemoryBucket::new();
    for key in DOCUMENTS {
        store.add_object(BUCKET, key);
    }
    store
}

fn tags(store: &MemoryBucket, keys: &[&str]) -> Vec<Option<String>> {
    keys.iter()
        .map(|key| store.tag(BUCKET, key, TAG).map(str::to_string))
        .collect()
}

fn reconcile(store: &mut impl ArchiveStore<Error = StoreError>) -> usize {
    let mut janitor = Janitor::default_config();
    let mut sink = CollectingSink::default();
    janitor.run_scheduled(store, &mut sink).unwrap().total_corrected()
}

#[test]
fn test_documents_schedule() {
    let mut store = documents_bucket();
    assert_eq!(reconcile(&mut store), DOCUMENTS.len());

    let expected: Vec<Option<String>> = [1095, 1095, 3, 7, 30, 7, 90, 365]
        .iter()
        .map(|days| Some(days.to_string()))
        .collect();
    assert_eq!(tags(&store, DOCUMENTS), expected);
}

#[test]
fn test_reconciliation_is_idempotent() {
    let mut store = documents_bucket();
    reconcile(&mut store);
    let writes = store.tag_writes().len();
    let first = tags(&store, DOCUMENTS);

    assert_eq!(reconcile(&mut store), 0);
    assert_eq!(store.tag_writes().len(), writes);
    assert_eq!(tags(&store, DOCUMENTS), first);
}

#[test]
fn test_reconciliation_never_lowers_a_tag() {
    let mut store = documents_bucket();
    // Manually extended retention on an ordinary archive
    store.add_tagged_object(BUCKET, DOCUMENTS[2], TAG, "4000");
    // Understated retention on the yearly archive
    store.add_tagged_object(BUCKET, DOCUMENTS[1], TAG, "30");

    reconcile(&mut store);
    assert_eq!(store.tag(BUCKET, DOCUMENTS[2], TAG), Some("4000"));
    assert_eq!(store.tag(BUCKET, DOCUMENTS[1], TAG), Some("1095"));
}

#[test]
fn test_tiers_do_not_depend_on_listing_order() {
    let mut sorted = documents_bucket();
    let mut reversed = ReversedListing(documents_bucket());

    reconcile(&mut sorted);
    reconcile(&mut reversed);
    assert_eq!(tags(&sorted, DOCUMENTS), tags(&reversed.0, DOCUMENTS));
}

#[test]
fn test_groups_are_classified_independently() {
    let mut store = MemoryBucket::new();
    store.add_object(BUCKET, "2024-01-01/01-00-00_documents.tar");
    store.add_object(BUCKET, "2024-01-01/02-00-00_photos.zip");
    store.add_object(BUCKET, "2024-01-01/03-00-00_photos.zip");

    reconcile(&mut store);
    // photos' first archive is yearly even though documents ran earlier that day
    assert_eq!(store.tag(BUCKET, "2024-01-01/01-00-00_documents.tar", TAG), Some("1095"));
    assert_eq!(store.tag(BUCKET, "2024-01-01/02-00-00_photos.zip", TAG), Some("3650"));
    assert_eq!(store.tag(BUCKET, "2024-01-01/03-00-00_photos.zip", TAG), Some("15"));
}

#[test]
fn test_short_table_skips_keys_without_aborting() {
    let mut store = MemoryBucket::new();
    store.add_object(BUCKET, "2024-01-01/00-00-00_logs.txt");
    store.add_object(BUCKET, "2024-01-01/00-00-01_logs.txt");
    store.add_object(BUCKET, "2024-01-01/00-00-00_photos.zip");

    let mut config = JanitorConfig::default();
    config.retention.set_group("logs", RetentionTable::new(vec![60, 30, 14]));
    let mut janitor = Janitor::new(config);
    let report = janitor
        .run_scheduled(&mut store, &mut CollectingSink::default())
        .unwrap();

    assert_eq!(report.total_corrected(), 2);
    assert_eq!(report.total_skipped(), 1);
    assert_eq!(store.tag(BUCKET, "2024-01-01/00-00-00_logs.txt", TAG), Some("60"));
    assert_eq!(store.tag(BUCKET, "2024-01-01/00-00-01_logs.txt", TAG), None);
    assert_eq!(store.tag(BUCKET, "2024-01-01/00-00-00_photos.zip", TAG), Some("3650"));
}

#[test]
fn test_malformed_and_unreadable_keys_are_tolerated() {
    let mut store = documents_bucket();
    store.add_object(BUCKET, "manifest.json");
    store.add_object(BUCKET, "2024-01-01/01-00-00_noextension");
    store.make_tags_unreadable(DOCUMENTS[0]);

    let mut janitor = Janitor::default_config();
    let report = janitor
        .run_scheduled(&mut store, &mut CollectingSink::default())
        .unwrap();

    assert_eq!(report.malformed.len(), 2);
    assert_eq!(report.total_corrected(), DOCUMENTS.len());
    assert_eq!(janitor.metrics().skipped, 2);
}

#[test]
fn test_tag_write_failure_aborts_invocation() {
    let mut store = documents_bucket();
    store.fail_tag_writes(true);

    let mut janitor = Janitor::default_config();
    let mut sink = CollectingSink::default();
    let err = janitor
        .handle(&Invocation::scheduled(), &mut store, &mut sink)
        .unwrap_err();

    assert!(matches!(err, JanitorError::Store { operation: "put_tag", .. }));
    assert!(err.to_string().contains(DOCUMENTS[0]));
    assert!(sink.datums("FixedTags").is_empty());
}

#[test]
fn test_uploads_then_reconcile_agree() {
    // Upload one archive at a time, tagging each as it arrives
    let mut store = MemoryBucket::new();
    let mut janitor = Janitor::default_config();
    let mut sink = CollectingSink::default();
    for key in DOCUMENTS {
        store.add_object(BUCKET, key);
        let outcome = janitor
            .handle(&Invocation::object_created(BUCKET, key), &mut store, &mut sink)
            .unwrap();
        assert!(matches!(outcome, Outcome::Tagged { .. }));
    }
    assert_eq!(sink.datums("TaggedNewArchive").len(), DOCUMENTS.len());

    // Chronological uploads already carry the right tags
    assert_eq!(reconcile(&mut store), 0);
}

#[test]
fn test_sqlite_bucket_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bucket.db");

    {
        let mut store = SqliteBucket::new(&path).unwrap();
        for key in DOCUMENTS {
            store.put_object(BUCKET, key, Some(1024)).unwrap();
        }
        store.put_object(BUCKET, "2024-01-01/05-00-00_My Photos.zip", None).unwrap();

        let mut janitor = Janitor::default_config();
        let mut sink = CollectingSink::default();
        let payload = Invocation::object_created(BUCKET, "2024-01-01/05-00-00_My+Photos.zip");
        match janitor.handle(&payload, &mut store, &mut sink).unwrap() {
            Outcome::Tagged { archives } => {
                assert_eq!(archives[0].archive_group, "My Photos");
                assert_eq!(archives[0].tier, Tier::YEARLY);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    let mut store = SqliteBucket::new(&path).unwrap();
    assert_eq!(
        store.get_tag(BUCKET, "2024-01-01/05-00-00_My Photos.zip", TAG).unwrap(),
        Some("3650".to_string())
    );

    let mut janitor = Janitor::default_config();
    let report = janitor
        .run_scheduled(&mut store, &mut CollectingSink::default())
        .unwrap();
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.total_corrected(), DOCUMENTS.len());
    assert_eq!(
        store.get_tag(BUCKET, DOCUMENTS[7], TAG).unwrap(),
        Some("365".to_string())
    );
}
