//! Handle command implementation.

use crate::cli::HandleArgs;
use crate::error::Result;
use crate::output::Formatter;
use keepdays_domain::traits::{ArchiveStore, MetricsSink};
use keepdays_janitor::{Janitor, JanitorConfig, Outcome};
use serde_json::Value;
use std::fmt::Display;
use std::io::Read;

/// Read the event payload named by the arguments.
pub fn read_event(args: &HandleArgs) -> Result<Value> {
    let text = if args.file == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(&args.file)?
    };
    Ok(serde_json::from_str(&text)?)
}

/// Whether the payload asks for a test execution.
pub fn is_test_event(payload: &Value) -> bool {
    payload.get("testmode").is_some()
}

/// Execute the handle command.
pub fn execute_handle<S, M>(
    payload: &Value,
    config: &JanitorConfig,
    store: &mut S,
    sink: &mut M,
    formatter: &Formatter,
) -> Result<()>
where
    S: ArchiveStore,
    S::Error: Display,
    M: MetricsSink,
    M::Error: Display,
{
    let mut janitor = Janitor::new(config.clone());
    match janitor.handle(payload, store, sink)? {
        Outcome::Tagged { archives } => println!("{}", formatter.format_tagged(&archives)?),
        Outcome::Reconciled { report } => println!("{}", formatter.format_report(&report)?),
        Outcome::Ignored => println!("{}", formatter.warning("Event type not recognized")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use keepdays_janitor::{CollectingSink, Invocation};
    use keepdays_store::SqliteBucket;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_event_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"source": "aws.events", "testmode": true}"#).unwrap();

        let payload = read_event(&HandleArgs {
            file: path.to_string_lossy().into_owned(),
        })
        .unwrap();
        assert!(is_test_event(&payload));
        assert!(!is_test_event(&Invocation::scheduled()));
    }

    #[test]
    fn test_handle_upload_event() {
        let config = JanitorConfig::default();
        let key = "2024-01-01/00-00-00_photos.zip";
        let mut store = SqliteBucket::in_memory().unwrap();
        store.put_object(&config.archive_bucket, key, None).unwrap();
        let mut sink = CollectingSink::default();
        let formatter = Formatter::new(OutputFormat::Json, false);

        let payload = Invocation::object_created(&config.archive_bucket, key);
        execute_handle(&payload, &config, &mut store, &mut sink, &formatter).unwrap();

        assert_eq!(
            store.get_tag(&config.archive_bucket, key, "keep-days").unwrap(),
            Some("3650".to_string())
        );
        assert_eq!(sink.datums("TaggedNewArchive").len(), 1);
    }

    #[test]
    fn test_handle_unrecognized_event() {
        let mut store = SqliteBucket::in_memory().unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let result = execute_handle(
            &json!({"detail-type": "something else"}),
            &JanitorConfig::default(),
            &mut store,
            &mut CollectingSink::default(),
            &formatter,
        );
        assert!(result.is_ok());
    }
}
