//! Metric accumulation and publishing
//!
//! Metrics are staged in a [`MetricManager`] during an invocation and posted
//! as one batch at the end. Posting never fails the invocation: sink errors
//! are logged and dropped.

use chrono::{DateTime, Utc};
use keepdays_domain::traits::{Dimension, MetricDatum, MetricUnit, MetricsSink};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt::Display;

/// A staged metric
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// Dimensions
    pub dimensions: Vec<Dimension>,
    /// Unit of `value`
    pub unit: MetricUnit,
    /// Latest value
    pub value: f64,
    /// When the metric was first staged
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    fn datum(&self) -> MetricDatum {
        MetricDatum {
            name: self.name.clone(),
            dimensions: self.dimensions.clone(),
            timestamp: self.timestamp,
            value: self.value,
            unit: self.unit,
        }
    }
}

/// Stages metrics by key and posts them to a [`MetricsSink`]
///
/// Adding a metric under an existing key replaces its value but keeps its
/// name, dimensions and timestamp.
///
/// # Examples
///
/// ```
/// use keepdays_domain::traits::{Dimension, MetricUnit};
/// use keepdays_janitor::{CollectingSink, MetricManager};
///
/// let mut metrics = MetricManager::new("Backups");
/// metrics.add_metric("FixedTags", "FixedTags", 3.0, MetricUnit::Count, Vec::new());
///
/// let mut sink = CollectingSink::default();
/// assert!(metrics.post_metrics(&mut sink, false));
/// assert_eq!(sink.batches[0].1[0].value, 3.0);
/// ```
#[derive(Debug, Clone)]
pub struct MetricManager {
    namespace: String,
    metrics: BTreeMap<String, Metric>,
}

impl MetricManager {
    /// Create an empty manager publishing under `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metrics: BTreeMap::new(),
        }
    }

    /// Stage a metric value under `key`
    pub fn add_metric(
        &mut self,
        key: &str,
        name: &str,
        value: f64,
        unit: MetricUnit,
        dimensions: Vec<Dimension>,
    ) {
        let metric = self.metrics.entry(key.to_string()).or_insert_with(|| Metric {
            name: name.to_string(),
            dimensions,
            unit,
            value,
            timestamp: Utc::now(),
        });
        metric.value = value;
    }

    /// Staged metric for `key`
    pub fn get(&self, key: &str) -> Option<&Metric> {
        self.metrics.get(key)
    }

    /// Number of staged metrics
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Post every staged metric as one batch
    ///
    /// In `pretend` mode nothing is sent. Returns whether the sink accepted
    /// the batch; failures are logged, never returned.
    pub fn post_metrics<M>(&self, sink: &mut M, pretend: bool) -> bool
    where
        M: MetricsSink,
        M::Error: Display,
    {
        let data: Vec<MetricDatum> = self.metrics.values().map(Metric::datum).collect();
        if data.is_empty() {
            tracing::debug!("No metrics staged for {}", self.namespace);
            return false;
        }
        let names: Vec<&str> = data.iter().map(|d| d.name.as_str()).collect();

        if pretend {
            tracing::info!(
                "DID NOT post metric data {:?} to {} because pretend mode was enabled",
                names,
                self.namespace
            );
            return false;
        }

        match sink.put_metric_data(&self.namespace, &data) {
            Ok(()) => {
                tracing::info!("Posted metric data {:?} to {}", names, self.namespace);
                true
            }
            Err(e) => {
                tracing::error!(
                    "Error posting metric data {:?} to {}: {}",
                    names,
                    self.namespace,
                    e
                );
                false
            }
        }
    }
}

/// Sink that writes each datum to the log as JSON
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl MetricsSink for LogSink {
    type Error = Infallible;

    fn put_metric_data(
        &mut self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> Result<(), Self::Error> {
        for datum in data {
            let rendered = serde_json::to_string(datum).unwrap_or_else(|_| format!("{:?}", datum));
            tracing::info!(target: "keepdays::metrics", namespace, "{}", rendered);
        }
        Ok(())
    }
}

/// Sink that keeps every batch in memory
///
/// Set `fail` to make it reject batches.
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    /// Accepted batches as `(namespace, data)`
    pub batches: Vec<(String, Vec<MetricDatum>)>,
    /// Reject every batch
    pub fail: bool,
}

impl CollectingSink {
    /// Every accepted datum with the given name
    pub fn datums(&self, name: &str) -> Vec<&MetricDatum> {
        self.batches
            .iter()
            .flat_map(|(_, data)| data.iter())
            .filter(|d| d.name == name)
            .collect()
    }
}

impl MetricsSink for CollectingSink {
    type Error = String;

    fn put_metric_data(
        &mut self,
        namespace: &str,
        data: &[MetricDatum],
    ) -> Result<(), Self::Error> {
        if self.fail {
            return Err("metrics endpoint unavailable".to_string());
        }
        self.batches.push((namespace.to_string(), data.to_vec()));
        Ok(())
    }
}
