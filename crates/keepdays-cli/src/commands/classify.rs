//! Classify command implementation.

use crate::cli::ClassifyArgs;
use crate::error::Result;
use crate::output::{ArchiveRow, Formatter};
use keepdays_domain::traits::ArchiveStore;
use keepdays_janitor::{ArchiveBucket, ArchiveCollection, JanitorConfig};
use std::fmt::Display;

/// Execute the classify command.
pub fn execute_classify<S>(
    args: ClassifyArgs,
    config: &JanitorConfig,
    store: &mut S,
    formatter: &Formatter,
) -> Result<()>
where
    S: ArchiveStore,
    S::Error: Display,
{
    let bucket_name = args.bucket.as_deref().unwrap_or(&config.archive_bucket);
    let mut bucket = ArchiveBucket::new(store, bucket_name, config.tag_key.as_str());

    if let (Some(group), Some(at)) = (args.group.as_deref(), args.at) {
        let mut collection = ArchiveCollection::load(&mut bucket, group)?;
        let tier = collection.determine_date_archive_tier(&at);
        let message = match config.retention.retention_days(group, tier) {
            Ok(days) => format!(
                "A {} archive at {} would be tier {} and kept {} days",
                group, at, tier, days
            ),
            Err(e) => format!("A {} archive at {} would be tier {}: {}", group, at, tier, e),
        };
        println!("{}", formatter.info(&message));
        return Ok(());
    }

    let mut rows = classify_rows(&mut bucket, config, args.group.as_deref())?;
    if let Some(tier) = args.tier {
        rows.retain(|row| row.tier == tier);
    }
    println!("{}", formatter.format_archives(&rows)?);

    let pending = rows.iter().filter(|row| row.needs_update()).count();
    if pending > 0 {
        eprintln!(
            "{}",
            formatter.warning(&format!("{} archive(s) need a tag update; run `reconcile`", pending))
        );
    }
    Ok(())
}

/// Tier, expected keep-days and current tag of every archive, by group.
pub fn classify_rows<S>(
    bucket: &mut ArchiveBucket<'_, S>,
    config: &JanitorConfig,
    group: Option<&str>,
) -> Result<Vec<ArchiveRow>>
where
    S: ArchiveStore,
    S::Error: Display,
{
    let groups = match group {
        Some(group) => vec![group.to_string()],
        None => bucket.archive_groups()?,
    };

    let mut rows = Vec::new();
    for group in groups {
        let mut collection = ArchiveCollection::load(bucket, &group)?;
        let keys: Vec<String> = collection
            .archives()
            .iter()
            .map(|archive| archive.as_str().to_string())
            .collect();

        for key in keys {
            let tier = collection.determine_archive_tier(&key)?;
            rows.push(ArchiveRow {
                keep_days: config.retention.retention_days(&group, tier).ok(),
                current_tag: bucket.get_archival_tag(&key),
                archive_group: group.clone(),
                tier,
                key,
            });
        }
    }
    Ok(rows)
}
