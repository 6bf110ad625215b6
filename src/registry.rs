use std::collections::HashMap;

use log::{debug, warn};
use prometheus::{GaugeVec, Opts, Registry};

use crate::catalog::MetricDescriptor;
use crate::error::{ExporterError, Result};
use crate::flatten::Sample;
use crate::schema::{LabelSchema, TARGET_LABEL};
use crate::transport::{PoolSummary, StorageResourceSummary};

/// Fixed label schema for the built-in capacity summaries
const SUMMARY_LABELS: [&str; 3] = [TARGET_LABEL, "id", "name"];

/// One registered metric: its compiled schema and gauge sink
struct RegistryEntry {
    schema: LabelSchema,
    gauge: GaugeVec,
}

/// Gauge families for pool capacity summaries
struct PoolGauges {
    size_free: GaugeVec,
    size_total: GaugeVec,
    size_used: GaugeVec,
    size_subscribed: GaugeVec,
}

/// Gauge families for storage-resource capacity summaries
struct StorageResourceGauges {
    size_allocated: GaugeVec,
    size_total: GaugeVec,
    size_used: GaugeVec,
}

/// Pairs metric definitions with their exposition sinks
///
/// Writes are last-write-wins per exact label tuple. Tuples that stop
/// recurring keep their last recorded value; nothing is evicted between
/// collect cycles.
pub struct MetricRegistry {
    registry: Registry,
    entries: HashMap<String, RegistryEntry>,
    pools: Option<PoolGauges>,
    storage_resources: Option<StorageResourceGauges>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            entries: HashMap::new(),
            pools: None,
            storage_resources: None,
        }
    }

    /// Register one catalog metric and create its gauge family
    ///
    /// All registration happens at startup, before collection begins.
    pub fn register_metric(&mut self, descriptor: MetricDescriptor) -> Result<()> {
        if self.entries.contains_key(&descriptor.name) {
            return Err(ExporterError::Config(format!(
                "metric '{}' registered twice",
                descriptor.name
            )));
        }

        let schema = descriptor.schema()?;
        let opts = Opts::new(descriptor.family_name(), descriptor.help_text());
        let gauge = GaugeVec::new(opts, &schema.label_refs())?;
        self.registry.register(Box::new(gauge.clone()))?;

        debug!(
            "Registered '{}' as family '{}' with labels {:?}",
            descriptor.name,
            descriptor.family_name(),
            schema.labels()
        );

        self.entries
            .insert(descriptor.name.clone(), RegistryEntry { schema, gauge });
        Ok(())
    }

    /// Create the pool capacity families
    pub fn enable_pool_gauges(&mut self) -> Result<()> {
        let gauges = PoolGauges {
            size_free: self
                .register_summary_gauge("pool_size_free_bytes", "Free capacity of the pool")?,
            size_total: self
                .register_summary_gauge("pool_size_total_bytes", "Total capacity of the pool")?,
            size_used: self
                .register_summary_gauge("pool_size_used_bytes", "Used capacity of the pool")?,
            size_subscribed: self.register_summary_gauge(
                "pool_size_subscribed_bytes",
                "Subscribed capacity of the pool",
            )?,
        };
        self.pools = Some(gauges);
        Ok(())
    }

    /// Create the storage-resource capacity families
    pub fn enable_storage_resource_gauges(&mut self) -> Result<()> {
        let gauges = StorageResourceGauges {
            size_allocated: self.register_summary_gauge(
                "storage_resource_size_allocated_bytes",
                "Allocated capacity of the storage resource",
            )?,
            size_total: self.register_summary_gauge(
                "storage_resource_size_total_bytes",
                "Total capacity of the storage resource",
            )?,
            size_used: self.register_summary_gauge(
                "storage_resource_size_used_bytes",
                "Used capacity of the storage resource",
            )?,
        };
        self.storage_resources = Some(gauges);
        Ok(())
    }

    fn register_summary_gauge(&mut self, name: &str, help: &str) -> Result<GaugeVec> {
        let gauge = GaugeVec::new(Opts::new(name, help), &SUMMARY_LABELS)?;
        self.registry.register(Box::new(gauge.clone()))?;
        Ok(gauge)
    }

    /// Record one sample against a registered metric
    ///
    /// The sample's label count must match the metric's schema exactly;
    /// a mismatch is an error, never a panic.
    pub fn record(&self, name: &str, sample: &Sample) -> Result<()> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ExporterError::Collection(format!("metric '{name}' is not registered")))?;

        if sample.labels.len() != entry.schema.len() {
            return Err(ExporterError::Parse(format!(
                "metric '{}': {} label values against {} schema labels ({:?})",
                name,
                sample.labels.len(),
                entry.schema.len(),
                sample.labels,
            )));
        }

        let values: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
        entry
            .gauge
            .get_metric_with_label_values(&values)?
            .set(sample.value);
        Ok(())
    }

    /// Record a batch of samples, skipping those that do not fit
    pub fn record_samples(&self, name: &str, samples: &[Sample]) -> usize {
        let mut recorded = 0;
        for sample in samples {
            match self.record(name, sample) {
                Ok(()) => recorded += 1,
                Err(e) => warn!("Dropping sample: {e}"),
            }
        }
        recorded
    }

    /// Record one pool capacity summary
    pub fn record_pool(&self, target: &str, pool: &PoolSummary) -> Result<()> {
        let gauges = self
            .pools
            .as_ref()
            .ok_or_else(|| ExporterError::Collection("pool gauges are not enabled".to_string()))?;

        let labels = [target, pool.id.as_str(), pool.name.as_str()];
        gauges
            .size_free
            .get_metric_with_label_values(&labels)?
            .set(pool.size_free as f64);
        gauges
            .size_total
            .get_metric_with_label_values(&labels)?
            .set(pool.size_total as f64);
        gauges
            .size_used
            .get_metric_with_label_values(&labels)?
            .set(pool.size_used as f64);
        gauges
            .size_subscribed
            .get_metric_with_label_values(&labels)?
            .set(pool.size_subscribed as f64);
        Ok(())
    }

    /// Record one storage-resource capacity summary
    pub fn record_storage_resource(
        &self,
        target: &str,
        resource: &StorageResourceSummary,
    ) -> Result<()> {
        let gauges = self.storage_resources.as_ref().ok_or_else(|| {
            ExporterError::Collection("storage-resource gauges are not enabled".to_string())
        })?;

        let labels = [target, resource.id.as_str(), resource.name.as_str()];
        gauges
            .size_allocated
            .get_metric_with_label_values(&labels)?
            .set(resource.size_allocated as f64);
        gauges
            .size_total
            .get_metric_with_label_values(&labels)?
            .set(resource.size_total as f64);
        gauges
            .size_used
            .get_metric_with_label_values(&labels)?
            .set(resource.size_used as f64);
        Ok(())
    }

    /// Number of registered catalog metrics
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The underlying prometheus registry, for the exposition endpoint
    pub fn prometheus_registry(&self) -> Registry {
        self.registry.clone()
    }

    /// Gather the current state of every family
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
