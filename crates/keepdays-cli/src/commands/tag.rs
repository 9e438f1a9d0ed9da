//! Tag command implementation.

use crate::cli::TagArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use keepdays_domain::traits::{ArchiveStore, MetricsSink};
use keepdays_janitor::{Event, Invocation, Janitor, JanitorConfig, Outcome};
use std::fmt::Display;

/// Execute the tag command.
///
/// Runs the same path as an upload notification carrying every given key.
pub fn execute_tag<S, M>(
    args: TagArgs,
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
    let bucket = args.bucket.unwrap_or_else(|| config.archive_bucket.clone());
    let invocation = Invocation {
        events: args
            .keys
            .into_iter()
            .map(|key| Event::ObjectCreated {
                bucket: bucket.clone(),
                key,
            })
            .collect(),
        test_mode: args.pretend,
    };

    let mut config = config.clone();
    config.dry_run |= args.dry_run;
    let mut janitor = Janitor::new(config);

    match janitor.handle_invocation(&invocation, store, sink)? {
        Outcome::Tagged { archives } => {
            println!("{}", formatter.format_tagged(&archives)?);
            Ok(())
        }
        other => Err(CliError::InvalidInput(format!(
            "Upload tagging produced {:?}",
            other
        ))),
    }
}
