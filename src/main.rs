use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};

use spindle::catalog::{load_catalog, select_metrics};
use spindle::collector::{CollectionScheduler, CollectorOptions, TargetCollector};
use spindle::config::{ExporterConfig, TargetConfig, load_config};
use spindle::exposition;
use spindle::registry::MetricRegistry;
use spindle::retry::{RetryConfig, execute_with_retry};
use spindle::transport::{RestClient, SessionFactory};
use spindle::util::logging;

/// Command line arguments for the exporter
#[derive(Parser, Debug)]
#[command(
    name = "spindle",
    version,
    about = "Prometheus exporter for storage array performance metrics"
)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/spindle.toml")]
    config: PathBuf,

    /// Path to the metric catalog
    #[arg(long, default_value = "config/metrics.json")]
    catalog: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration from the specified file
    let config: ExporterConfig = match load_config(&args.config) {
        Ok(config) => {
            // Initialize logger with config-specified level
            logging::init(&config.log_level);
            info!("Configuration loaded from {}", args.config.display());
            config
        }
        Err(e) => {
            // Initialize logger with default level for error reporting
            logging::init(&spindle::config::LogLevel::Error);
            error!("Failed to load configuration: {}", e);
            return Err(anyhow::anyhow!("Failed to load configuration: {}", e));
        }
    };

    info!("spindle {} starting", spindle::VERSION);

    // Load the metric catalog and resolve the configured selection
    let catalog = load_catalog(&args.catalog)
        .with_context(|| format!("loading metric catalog from {}", args.catalog.display()))?;
    let selected = select_metrics(&catalog, &config.metrics)?;
    info!(
        "Collecting {} of {} catalog metrics",
        selected.len(),
        catalog.len()
    );

    // Build the registry: gauge families are created up front so label
    // schema problems surface before the first cycle
    let mut registry = MetricRegistry::new();
    if config.pools {
        registry.enable_pool_gauges()?;
    }
    if config.storage_resources {
        registry.enable_storage_resource_gauges()?;
    }
    for metric in &selected {
        registry.register_metric(metric.clone())?;
    }

    let registry = Arc::new(registry);
    let metrics = Arc::new(selected);
    let options = CollectorOptions {
        interval_secs: config.interval,
        pools: config.pools,
        storage_resources: config.storage_resources,
        retry: RetryConfig::default(),
    };

    // One collector per target, each with its own session factory
    let mut collectors = Vec::with_capacity(config.targets.len());
    for target in &config.targets {
        let client = RestClient::new(target);
        let name = resolve_target_name(target, &client, &options.retry).await;
        info!("Monitoring array '{}' at {}", name, target.address);

        collectors.push(TargetCollector::new(
            name,
            client,
            Arc::clone(&metrics),
            Arc::clone(&registry),
            options.clone(),
        ));
    }

    let scheduler = CollectionScheduler::new(collectors, Duration::from_secs(config.interval));
    info!(
        "Scheduling {} targets every {} seconds",
        scheduler.target_count(),
        config.interval
    );

    let prometheus_registry = registry.prometheus_registry();
    tokio::spawn(async move {
        scheduler.run().await;
    });

    exposition::serve(config.port, prometheus_registry).await?;
    Ok(())
}

/// Resolve the display name used as the target label value
///
/// A configured name wins; otherwise the array is asked for its own name,
/// falling back to the address so an unreachable array at startup does not
/// stop the exporter.
async fn resolve_target_name(
    target: &TargetConfig,
    client: &RestClient,
    retry: &RetryConfig,
) -> String {
    if let Some(name) = &target.name {
        return name.clone();
    }

    let context = format!("{}: name resolution", target.address);
    match execute_with_retry(|| client.system_name(), retry.clone(), &context).await {
        Ok(name) => name,
        Err(e) => {
            warn!(
                "Could not resolve a name for {}: {}; using the address",
                target.address, e
            );
            target.address.clone()
        }
    }
}
