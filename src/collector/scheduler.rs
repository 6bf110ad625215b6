use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::task::JoinSet;
use tokio::time::sleep;

use super::cycle::TargetCollector;
use crate::transport::SessionFactory;

/// Runs collect cycles across all configured targets
///
/// Targets run concurrently within a cycle, but the next cycle only starts
/// once every target has finished, so cycles for one target never overlap.
pub struct CollectionScheduler<F: SessionFactory> {
    collectors: Vec<Arc<TargetCollector<F>>>,
    interval: Duration,
}

impl<F: SessionFactory> CollectionScheduler<F> {
    pub fn new(collectors: Vec<TargetCollector<F>>, interval: Duration) -> Self {
        Self {
            collectors: collectors.into_iter().map(Arc::new).collect(),
            interval,
        }
    }

    /// Number of scheduled targets
    pub fn target_count(&self) -> usize {
        self.collectors.len()
    }

    /// Drive collection at the configured cadence until the process exits
    pub async fn run(&self) {
        loop {
            self.run_once().await;
            sleep(self.interval).await;
        }
    }

    /// Run one cycle across all targets and wait for every one of them
    pub async fn run_once(&self) {
        let mut cycles = JoinSet::new();

        for collector in &self.collectors {
            let collector = Arc::clone(collector);
            cycles.spawn(async move {
                let outcome = collector.run_cycle().await;
                (collector, outcome)
            });
        }

        while let Some(joined) = cycles.join_next().await {
            match joined {
                Ok((collector, Ok(outcome))) => info!(
                    "{}: cycle complete, {} records ({} point-in-time, {} continuous, {} pool, {} storage-resource)",
                    collector.name(),
                    outcome.total(),
                    outcome.point_in_time,
                    outcome.continuous,
                    outcome.pools,
                    outcome.storage_resources
                ),
                Ok((collector, Err(e))) => error!(
                    "{}: cycle failed, keeping previous values: {}",
                    collector.name(),
                    e
                ),
                Err(e) => error!("Collect task panicked: {e}"),
            }
        }
    }
}
