//! Background worker for scheduled reconciliation

use crate::{Janitor, JanitorConfig, JanitorError, JanitorMetrics};
use keepdays_domain::traits::{ArchiveStore, MetricsSink};
use std::fmt::Display;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Background worker that reconciles the archive bucket on a schedule
///
/// Stands in for the external scheduler when running locally: every
/// `sweep_interval_minutes` it performs the same reconciliation a scheduled
/// trigger would.
///
/// # Examples
///
/// ```no_run
/// use keepdays_janitor::{JanitorConfig, JanitorWorker, LogSink};
/// use keepdays_store::SqliteBucket;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteBucket::new("keepdays.db")?;
///     let mut worker = JanitorWorker::new(JanitorConfig::default())?;
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(store, LogSink).await?;
///     Ok(())
/// }
/// ```
pub struct JanitorWorker {
    janitor: Janitor,
    interval: Duration,
}

impl JanitorWorker {
    /// Create a new background worker with the given configuration
    ///
    /// # Errors
    /// [`JanitorError::Config`] if the configuration does not validate,
    /// e.g. a zero sweep interval.
    pub fn new(config: JanitorConfig) -> Result<Self, JanitorError> {
        config.validate()?;
        let interval = config.sweep_interval();
        Ok(Self {
            janitor: Janitor::new(config),
            interval,
        })
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Self {
        let config = JanitorConfig::default();
        Self {
            interval: config.sweep_interval(),
            janitor: Janitor::new(config),
        }
    }

    /// Time between reconciliations
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed reconciliation is logged and retried on the next tick.
    pub async fn run<S, M>(&mut self, mut store: S, mut sink: M) -> Result<(), JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
        M: MetricsSink,
        M::Error: Display,
    {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!("Janitor worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting scheduled reconciliation");

                    match self.janitor.run_scheduled(&mut store, &mut sink) {
                        Ok(report) => {
                            tracing::info!(
                                "Reconciliation completed: {} groups, {} tags fixed",
                                report.groups.len(),
                                report.total_corrected()
                            );
                        }
                        Err(e) => {
                            tracing::error!("Reconciliation failed: {}", e);
                        }
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        return Err(JanitorError::Worker(format!(
                            "Failed to listen for shutdown signal: {}",
                            e
                        )));
                    }
                    tracing::info!("Shutdown signal received, stopping janitor");
                    break;
                }
            }
        }

        tracing::info!("Janitor stopped. Final metrics:\n{}", self.janitor.metrics().summary());
        Ok(())
    }

    /// Run a fixed number of reconciliations, stopping at the first failure
    pub async fn run_cycles<S, M>(
        &mut self,
        mut store: S,
        mut sink: M,
        cycles: usize,
    ) -> Result<(S, M), JanitorError>
    where
        S: ArchiveStore,
        S::Error: Display,
        M: MetricsSink,
        M::Error: Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Janitor worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting reconciliation {}/{}", cycle + 1, cycles);

            match self.janitor.run_scheduled(&mut store, &mut sink) {
                Ok(report) => {
                    tracing::info!(
                        "Reconciliation {}/{} completed: {} tags fixed",
                        cycle + 1,
                        cycles,
                        report.total_corrected()
                    );
                }
                Err(e) => {
                    tracing::error!("Reconciliation {}/{} failed: {}", cycle + 1, cycles, e);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "Janitor finished {} cycles. Final metrics:\n{}",
            cycles,
            self.janitor.metrics().summary()
        );

        Ok((store, sink))
    }

    /// Get a reference to the janitor's current metrics
    pub fn metrics(&self) -> &JanitorMetrics {
        self.janitor.metrics()
    }

    /// Reset the janitor's metrics counters
    pub fn reset_metrics(&mut self) {
        self.janitor.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectingSink;
    use keepdays_store::MemoryBucket;

    const BUCKET: &str = "com.mysite.myarchive.bucket";

    fn store() -> MemoryBucket {
        let mut store = MemoryBucket::new();
        store.add_object(BUCKET, "2023-01-01/00-00-00_documents.tar");
        store.add_object(BUCKET, "2023-01-02/00-00-00_documents.tar");
        store
    }

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = JanitorWorker::default_config();
        assert_eq!(worker.metrics().sweep_count, 0);
        assert_eq!(worker.interval(), Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        for minutes in [0, u64::MAX] {
            let config = JanitorConfig {
                sweep_interval_minutes: minutes,
                ..Default::default()
            };
            assert!(matches!(JanitorWorker::new(config), Err(JanitorError::Config(_))));
        }

        let config = JanitorConfig {
            sweep_interval_minutes: 5,
            ..Default::default()
        };
        let worker = JanitorWorker::new(config).unwrap();
        assert_eq!(worker.interval(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles() {
        let mut worker = JanitorWorker::default_config();
        let (store, sink) = worker
            .run_cycles(store(), CollectingSink::default(), 2)
            .await
            .unwrap();

        assert_eq!(worker.metrics().sweep_count, 2);
        // First cycle fixes both tags, second finds nothing to do
        let fixed: Vec<f64> = sink.datums("FixedTags").iter().map(|d| d.value).collect();
        assert_eq!(fixed, vec![2.0, 0.0]);
        assert_eq!(store.tag_writes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycles_stops_on_failure() {
        let mut failing = store();
        failing.fail_tag_writes(true);

        let mut worker = JanitorWorker::default_config();
        let result = worker
            .run_cycles(failing, CollectingSink::default(), 3)
            .await;

        assert!(matches!(result, Err(JanitorError::Store { .. })));
        assert_eq!(worker.metrics().sweep_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_metrics() {
        let config = JanitorConfig {
            sweep_interval_minutes: 1,
            ..Default::default()
        };
        let mut worker = JanitorWorker::new(config).unwrap();

        worker
            .run_cycles(store(), CollectingSink::default(), 1)
            .await
            .unwrap();
        assert_eq!(worker.metrics().sweep_count, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().sweep_count, 0);
    }
}
