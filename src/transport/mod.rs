//! Session transport against array management endpoints

mod error;
mod rest;

pub use error::{TransportError, TransportResult};
pub use rest::RestClient;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

/// Handle for one registered continuous-sampling batch
#[derive(Debug, Clone)]
pub struct ContinuousQuery {
    /// Query id assigned by the array
    pub id: u64,
    /// Sampling interval granted by the array, in seconds
    pub interval_secs: u64,
    /// Paths covered by the batch, in registration order
    pub paths: Vec<String>,
}

/// Capacity summary for one storage pool
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size_free: u64,
    #[serde(default)]
    pub size_total: u64,
    #[serde(default)]
    pub size_used: u64,
    #[serde(default)]
    pub size_subscribed: u64,
}

/// Capacity summary for one provisioned storage resource
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageResourceSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub size_allocated: u64,
    #[serde(default)]
    pub size_total: u64,
    #[serde(default)]
    pub size_used: u64,
}

/// An open management session against one array
///
/// Sessions are opened fresh for each collect cycle and released at its end.
/// All calls may fail with transport errors; callers decide the blast radius.
#[async_trait]
pub trait ArraySession: Send + Sync {
    /// Fetch the most recent nested value tree for one metric path
    ///
    /// Returns `None` when the array has no readings for the path yet.
    async fn query_point_in_time(&self, path: &str) -> TransportResult<Option<Value>>;

    /// Register one batched continuous-sampling query covering all paths
    async fn register_continuous(
        &self,
        paths: &[String],
        interval_secs: u64,
    ) -> TransportResult<ContinuousQuery>;

    /// Retrieve batched results, one entry per registered path in order
    async fn fetch_continuous(&self, query: &ContinuousQuery)
    -> TransportResult<Vec<Option<Value>>>;

    /// List pool capacity summaries
    async fn pool_summaries(&self) -> TransportResult<Vec<PoolSummary>>;

    /// List storage-resource capacity summaries
    async fn storage_resource_summaries(&self) -> TransportResult<Vec<StorageResourceSummary>>;

    /// Release the session on the array side
    async fn close(&self) -> TransportResult<()>;
}

/// Opens sessions against one configured array
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    type Session: ArraySession + Send + Sync + 'static;

    /// Open a fresh authenticated session
    async fn open(&self) -> TransportResult<Self::Session>;

    /// Resolve the array's display name without authenticating
    async fn system_name(&self) -> TransportResult<String>;
}
