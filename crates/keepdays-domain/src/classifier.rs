//! Tier classification over a date-part trie
//!
//! Each archive group gets its own trie. Archives are inserted in ascending
//! chronological order (ties broken by key); an archive's tier is the number
//! of leading date-part levels (year, quarter, month, week, day, second) whose
//! values had already been seen on the same path by an earlier archive.
//!
//! The first archive of a new year therefore lands in tier 0, the first of a
//! new quarter within a known year in tier 1, and an archive on a day that
//! already has one lands in tier 5.

use crate::archive_key::ArchiveKey;
use crate::date_parts::DatePartPath;
use crate::tier::Tier;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// One trie level: children keyed by the next date-part value
#[derive(Debug, Clone, Default)]
struct DatePartNode {
    children: BTreeMap<i64, DatePartNode>,
}

/// Date-part trie for a single archive group
#[derive(Debug, Clone, Default)]
struct DatePartTrie {
    root: DatePartNode,
    len: usize,
}

impl DatePartTrie {
    /// Insert a path, returning how many leading levels already existed
    fn insert(&mut self, path: &DatePartPath) -> usize {
        let mut matched = 0;
        let mut extending = true;
        let mut node = &mut self.root;
        for value in path.values() {
            if extending && node.children.contains_key(value) {
                matched += 1;
            } else {
                extending = false;
            }
            node = node.children.entry(*value).or_default();
        }
        self.len += 1;
        matched
    }

    /// Count leading levels of `path` already present, without inserting
    fn matched_prefix(&self, path: &DatePartPath) -> usize {
        let mut node = &self.root;
        let mut matched = 0;
        for value in path.values() {
            match node.children.get(value) {
                Some(child) => {
                    matched += 1;
                    node = child;
                }
                None => break,
            }
        }
        matched
    }
}

/// Assigns retention tiers to the archives of one group
///
/// Built from the group's full archive set; the classifier sorts its input,
/// so the listing order of the archives never affects the result.
///
/// # Examples
///
/// ```
/// use keepdays_domain::{ArchiveKey, Tier, TierClassifier};
///
/// let archives: Vec<ArchiveKey> = [
///     "2023-04-01/00-00-01_documents.tar",
///     "2023-01-01/00-00-00_documents.tar",
///     "2023-04-01/00-00-00_documents.tar",
/// ]
/// .iter()
/// .map(|k| ArchiveKey::parse(k).unwrap())
/// .collect();
///
/// let classifier = TierClassifier::from_archives(&archives);
/// assert_eq!(classifier.tier_of("2023-01-01/00-00-00_documents.tar"), Some(Tier::YEARLY));
/// assert_eq!(classifier.tier_of("2023-04-01/00-00-00_documents.tar"), Some(Tier::QUARTERLY));
/// assert_eq!(classifier.tier_of("2023-04-01/00-00-01_documents.tar"), Some(Tier::ORDINARY));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TierClassifier {
    trie: DatePartTrie,
    tiers: BTreeMap<String, Tier>,
}

impl TierClassifier {
    /// Classify a set of archives (normally all archives of one group)
    pub fn from_archives<'a, I>(archives: I) -> Self
    where
        I: IntoIterator<Item = &'a ArchiveKey>,
    {
        let mut ordered: Vec<&ArchiveKey> = archives.into_iter().collect();
        ordered.sort();
        ordered.dedup_by(|a, b| a.as_str() == b.as_str());

        let mut classifier = Self::default();
        for archive in ordered {
            let path = DatePartPath::new(&archive.timestamp());
            let tier = Tier::clamped(classifier.trie.insert(&path));
            classifier.tiers.insert(archive.as_str().to_string(), tier);
        }
        classifier
    }

    /// Classify bare timestamps, keyed by timestamp
    ///
    /// Duplicate timestamps collapse into one entry.
    pub fn classify<I>(timestamps: I) -> BTreeMap<NaiveDateTime, Tier>
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let ordered: std::collections::BTreeSet<NaiveDateTime> = timestamps.into_iter().collect();
        let mut trie = DatePartTrie::default();
        ordered
            .into_iter()
            .map(|timestamp| {
                let tier = Tier::clamped(trie.insert(&DatePartPath::new(&timestamp)));
                (timestamp, tier)
            })
            .collect()
    }

    /// Tier assigned to a classified archive key
    pub fn tier_of(&self, key: &str) -> Option<Tier> {
        self.tiers.get(key).copied()
    }

    /// Tier a new archive at `timestamp` would get if it followed every
    /// classified archive. Does not modify the classifier.
    pub fn tier_for_timestamp(&self, timestamp: &NaiveDateTime) -> Tier {
        Tier::clamped(self.trie.matched_prefix(&DatePartPath::new(timestamp)))
    }

    /// Every classified key with its tier
    pub fn tiers(&self) -> &BTreeMap<String, Tier> {
        &self.tiers
    }

    /// Number of archives classified
    pub fn len(&self) -> usize {
        self.trie.len
    }

    /// Whether no archives were classified
    pub fn is_empty(&self) -> bool {
        self.trie.len == 0
    }
}
