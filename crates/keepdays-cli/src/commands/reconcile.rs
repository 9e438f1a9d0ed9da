//! Reconcile and watch command implementations.

use crate::cli::{ReconcileArgs, WatchArgs};
use crate::error::{CliError, Result};
use crate::output::Formatter;
use keepdays_domain::traits::{ArchiveStore, MetricsSink};
use keepdays_janitor::{Event, Invocation, Janitor, JanitorConfig, JanitorWorker, Outcome};
use std::fmt::Display;

/// Execute the reconcile command.
///
/// Runs the same path as a scheduled trigger against the chosen bucket.
pub fn execute_reconcile<S, M>(
    args: ReconcileArgs,
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
    let mut config = config.clone();
    if let Some(bucket) = args.bucket {
        config.archive_bucket = bucket;
    }
    config.dry_run |= args.dry_run;

    let invocation = Invocation {
        events: vec![Event::Scheduled],
        test_mode: args.pretend,
    };
    let mut janitor = Janitor::new(config);

    match janitor.handle_invocation(&invocation, store, sink)? {
        Outcome::Reconciled { report } => {
            println!("{}", formatter.format_report(&report)?);
            tracing::debug!("{}", janitor.metrics().summary());
            Ok(())
        }
        other => Err(CliError::InvalidInput(format!(
            "Reconciliation produced {:?}",
            other
        ))),
    }
}

/// Execute the watch command.
pub async fn execute_watch<S, M>(
    args: WatchArgs,
    config: &JanitorConfig,
    store: S,
    sink: M,
    formatter: &Formatter,
) -> Result<()>
where
    S: ArchiveStore,
    S::Error: Display,
    M: MetricsSink,
    M::Error: Display,
{
    let mut config = config.clone();
    if let Some(minutes) = args.interval {
        config.sweep_interval_minutes = minutes;
    }
    config.dry_run |= args.dry_run;
    let bucket = config.archive_bucket.clone();
    let minutes = config.sweep_interval_minutes;
    let mut worker = JanitorWorker::new(config)?;

    println!(
        "{}",
        formatter.info(&format!(
            "Reconciling {} every {} minute(s); press Ctrl+C to stop",
            bucket, minutes
        ))
    );

    match args.cycles {
        Some(cycles) => {
            worker.run_cycles(store, sink, cycles).await?;
        }
        None => worker.run(store, sink).await?,
    }

    println!("{}", worker.metrics().summary());
    Ok(())
}
