use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde_json::Value;
use tokio::time::sleep;

use crate::catalog::MetricDescriptor;
use crate::error::Result;
use crate::flatten::flatten_tree;
use crate::registry::MetricRegistry;
use crate::retry::{RetryConfig, execute_with_retry};
use crate::transport::{ArraySession, SessionFactory};

/// Per-target collection options shared by every cycle
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Sampling and polling interval in seconds
    pub interval_secs: u64,
    /// Collect pool capacity summaries
    pub pools: bool,
    /// Collect storage-resource capacity summaries
    pub storage_resources: bool,
    /// Retry policy for session opens
    pub retry: RetryConfig,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            pools: false,
            storage_resources: false,
            retry: RetryConfig::default(),
        }
    }
}

/// What one collect cycle accomplished
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Samples recorded from point-in-time queries
    pub point_in_time: usize,
    /// Samples recorded from the continuous batch
    pub continuous: usize,
    /// Pools recorded
    pub pools: usize,
    /// Storage resources recorded
    pub storage_resources: usize,
}

impl CycleOutcome {
    /// Total records across all phases
    pub fn total(&self) -> usize {
        self.point_in_time + self.continuous + self.pools + self.storage_resources
    }
}

/// Drives the collect cycle for one monitored array
///
/// Each cycle opens a fresh session, runs every collection phase, then
/// releases the session. A failed phase is contained to that phase; a failed
/// open is contained to the cycle.
pub struct TargetCollector<F: SessionFactory> {
    /// Display name, used as the target label value
    name: String,
    factory: F,
    metrics: Arc<Vec<MetricDescriptor>>,
    registry: Arc<MetricRegistry>,
    options: CollectorOptions,
}

impl<F: SessionFactory> TargetCollector<F> {
    pub fn new(
        name: impl Into<String>,
        factory: F,
        metrics: Arc<Vec<MetricDescriptor>>,
        registry: Arc<MetricRegistry>,
        options: CollectorOptions,
    ) -> Self {
        Self {
            name: name.into(),
            factory,
            metrics,
            registry,
            options,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one full collect cycle
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        let session = execute_with_retry(
            || self.factory.open(),
            self.options.retry.clone(),
            &format!("{}: session open", self.name),
        )
        .await?;

        // Phases write to disjoint families, so they can run together
        let (point_in_time, continuous, pools, storage_resources) = tokio::join!(
            self.collect_point_in_time(&session),
            self.collect_continuous(&session),
            self.collect_pools(&session),
            self.collect_storage_resources(&session),
        );

        if let Err(e) = session.close().await {
            warn!("{}: session close failed: {}", self.name, e);
        }

        Ok(CycleOutcome {
            point_in_time: self.phase_count(point_in_time, "point-in-time"),
            continuous: self.phase_count(continuous, "continuous"),
            pools: self.phase_count(pools, "pool"),
            storage_resources: self.phase_count(storage_resources, "storage-resource"),
        })
    }

    fn phase_count(&self, outcome: Result<usize>, phase: &str) -> usize {
        match outcome {
            Ok(recorded) => recorded,
            Err(e) => {
                warn!("{}: {} collection failed: {}", self.name, phase, e);
                0
            }
        }
    }

    /// Query each point-in-time metric on its own
    ///
    /// A failing or empty metric is skipped, not the phase.
    async fn collect_point_in_time(&self, session: &F::Session) -> Result<usize> {
        let mut recorded = 0;

        for metric in self.metrics.iter().filter(|m| m.point_in_time) {
            match session.query_point_in_time(&metric.path).await {
                Ok(Some(values)) => recorded += self.record_tree(metric, &values),
                Ok(None) => debug!("{}: no readings yet for {}", self.name, metric.name),
                Err(e) => warn!("{}: could not get {}: {}", self.name, metric.name, e),
            }
        }

        Ok(recorded)
    }

    /// Register one batched continuous query, wait out the granted sampling
    /// interval, then fetch and record the whole batch
    async fn collect_continuous(&self, session: &F::Session) -> Result<usize> {
        let continuous: Vec<&MetricDescriptor> =
            self.metrics.iter().filter(|m| m.continuous).collect();
        if continuous.is_empty() {
            return Ok(0);
        }

        let paths: Vec<String> = continuous.iter().map(|m| m.path.clone()).collect();
        let query = session
            .register_continuous(&paths, self.options.interval_secs)
            .await?;
        debug!(
            "{}: continuous query {} covers {} paths, sampling for {}s",
            self.name,
            query.id,
            paths.len(),
            query.interval_secs
        );

        // The array needs the granted interval to complete a sampling window
        sleep(Duration::from_secs(query.interval_secs)).await;

        let results = session.fetch_continuous(&query).await?;
        if results.len() != continuous.len() {
            warn!(
                "{}: continuous batch returned {} results for {} paths",
                self.name,
                results.len(),
                continuous.len()
            );
        }

        let mut recorded = 0;
        for (metric, values) in continuous.iter().zip(results.iter()) {
            match values {
                Some(values) => recorded += self.record_tree(metric, values),
                None => debug!("{}: empty continuous result for {}", self.name, metric.name),
            }
        }

        Ok(recorded)
    }

    async fn collect_pools(&self, session: &F::Session) -> Result<usize> {
        if !self.options.pools {
            return Ok(0);
        }

        let pools = session.pool_summaries().await?;
        let recorded = pools.len();
        for pool in &pools {
            self.registry.record_pool(&self.name, pool)?;
        }
        Ok(recorded)
    }

    async fn collect_storage_resources(&self, session: &F::Session) -> Result<usize> {
        if !self.options.storage_resources {
            return Ok(0);
        }

        let resources = session.storage_resource_summaries().await?;
        let recorded = resources.len();
        for resource in &resources {
            self.registry.record_storage_resource(&self.name, resource)?;
        }
        Ok(recorded)
    }

    /// Flatten one value tree and record it against the metric's family
    fn record_tree(&self, metric: &MetricDescriptor, values: &Value) -> usize {
        let tree = match values.as_object() {
            Some(tree) => tree,
            None => {
                warn!(
                    "{}: expected a value tree for {}, got a bare value",
                    self.name, metric.name
                );
                return 0;
            }
        };

        let base = vec![self.name.clone()];
        let samples = flatten_tree(tree, &base);
        self.registry.record_samples(&metric.name, &samples)
    }
}
