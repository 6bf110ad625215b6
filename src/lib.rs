//! A prometheus exporter for storage-array performance metrics

pub mod catalog;
pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod flatten;
pub mod registry;
pub mod retry;
pub mod schema;
pub mod transport;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::catalog::{MetricDescriptor, load_catalog, select_metrics};
    pub use crate::collector::{CollectionScheduler, CollectorOptions, TargetCollector};
    pub use crate::config::{ExporterConfig, TargetConfig, load_config};
    pub use crate::error::{ExporterError, Result};
    pub use crate::flatten::{Sample, flatten_tree};
    pub use crate::registry::MetricRegistry;
    pub use crate::retry::{RetryConfig, execute_with_retry};
    pub use crate::schema::{LabelSchema, TARGET_LABEL};
    pub use crate::transport::{ArraySession, RestClient, SessionFactory};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
