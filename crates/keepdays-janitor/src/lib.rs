//! Keepdays Janitor
//!
//! Assigns and maintains keep-days retention tags on time-stamped backup
//! archives.
//!
//! # Overview
//!
//! The Janitor is responsible for:
//! - **Upload tagging**: classifying a newly uploaded archive against its
//!   group's history and writing its keep-days tag
//! - **Scheduled reconciliation**: reclassifying every archive in the bucket and
//!   raising any tag that is missing or too low
//! - **Metrics**: staging counters per invocation and posting them in one batch
//!
//! # Tiers
//!
//! Within an archive group, each archive is ranked by the coarsest calendar
//! period it is the first archive of:
//!
//! | Tier | First archive of | `documents` | default |
//! |------|------------------|-------------|---------|
//! | 0 | year | 1095 | 3650 |
//! | 1 | quarter | 365 | 730 |
//! | 2 | month | 90 | 365 |
//! | 3 | ISO week | 30 | 90 |
//! | 4 | day | 7 | 30 |
//! | 5 | none of these | 3 | 15 |
//!
//! # Usage
//!
//! ## Handling an invocation
//!
//! ```
//! use keepdays_janitor::{Invocation, Janitor, LogSink, Outcome};
//! use keepdays_store::MemoryBucket;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = MemoryBucket::new();
//! store.add_object("com.mysite.myarchive.bucket", "2024-03-01/02-00-00_photos.zip");
//!
//! let mut janitor = Janitor::default_config();
//! let outcome = janitor.handle(&Invocation::scheduled(), &mut store, &mut LogSink)?;
//!
//! if let Outcome::Reconciled { report } = outcome {
//!     assert_eq!(report.total_corrected(), 1);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Background Worker
//!
//! ```no_run
//! use keepdays_janitor::{JanitorConfig, JanitorWorker, LogSink};
//! use keepdays_store::SqliteBucket;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteBucket::new("keepdays.db")?;
//!     let mut worker = JanitorWorker::new(JanitorConfig::default())?;
//!
//!     // Run indefinitely (until Ctrl+C)
//!     worker.run(store, LogSink).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The Janitor can be configured via TOML:
//!
//! ```toml
//! archive_bucket = "com.mysite.myarchive.bucket"
//! metric_namespace = "SimpleS3BackupManager"
//! tag_key = "keep-days"
//! sweep_interval_minutes = 1440
//! dry_run = false
//!
//! [retention]
//! default = [3650, 730, 365, 90, 30, 15]
//!
//! [retention.groups]
//! documents = [1095, 365, 90, 30, 7, 3]
//! ```

#![warn(missing_docs)]

mod bucket;
mod collection;
mod config;
mod error;
mod event;
mod janitor;
mod metrics;
mod publisher;
mod worker;

pub use bucket::ArchiveBucket;
pub use collection::{ArchiveCollection, GroupReport, TaggedArchive};
pub use config::{JanitorConfig, MAX_SWEEP_INTERVAL_MINUTES};
pub use error::JanitorError;
pub use event::{Event, Invocation};
pub use janitor::{Janitor, Outcome, ReconcileReport};
pub use metrics::JanitorMetrics;
pub use publisher::{CollectingSink, LogSink, Metric, MetricManager};
pub use worker::JanitorWorker;
