use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::error::{TransportError, TransportResult};
use super::{ArraySession, ContinuousQuery, PoolSummary, SessionFactory, StorageResourceSummary};
use crate::config::TargetConfig;

/// Header every management request must carry
const REST_CLIENT_HEADER: &str = "X-EMC-REST-CLIENT";
/// Anti-forgery token header required on mutating requests
const CSRF_HEADER: &str = "EMC-CSRF-TOKEN";
/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Session factory for one array's REST management endpoint
pub struct RestClient {
    address: String,
    base_url: String,
    username: String,
    password: String,
    insecure: bool,
}

impl RestClient {
    pub fn new(target: &TargetConfig) -> Self {
        Self {
            address: target.address.clone(),
            base_url: format!("https://{}:{}", target.address, target.port),
            username: target.username.clone(),
            password: target.password.clone(),
            insecure: target.insecure,
        }
    }

    /// Build an HTTP client with a fresh cookie jar
    ///
    /// The array tracks sessions through cookies, so each session needs its
    /// own jar rather than one shared across the factory.
    fn build_http(&self) -> TransportResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(REST_CLIENT_HEADER, HeaderValue::from_static("true"));

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(self.insecure)
            .default_headers(headers)
            .build()?;
        Ok(http)
    }
}

#[async_trait]
impl SessionFactory for RestClient {
    type Session = RestSession;

    async fn open(&self) -> TransportResult<RestSession> {
        let http = self.build_http()?;

        debug!("Opening session against {}", self.address);
        let response = http
            .get(format!(
                "{}/api/types/loginSessionInfo/instances",
                self.base_url
            ))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Login {
                address: self.address.clone(),
                reason: format!("status {status}"),
            });
        }

        let csrf_token = response
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RestSession {
            http,
            base_url: self.base_url.clone(),
            csrf_token,
        })
    }

    async fn system_name(&self) -> TransportResult<String> {
        let http = self.build_http()?;
        let url = format!("{}/api/types/basicSystemInfo/instances", self.base_url);

        let response = http
            .get(&url)
            .query(&[("fields", "name")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: "basicSystemInfo".to_string(),
            });
        }

        let info: Collection<SystemInfo> = response.json().await.map_err(|e| {
            TransportError::Decode {
                path: "basicSystemInfo".to_string(),
                reason: e.to_string(),
            }
        })?;

        info.entries
            .into_iter()
            .next()
            .map(|e| e.content.name)
            .ok_or_else(|| TransportError::Decode {
                path: "basicSystemInfo".to_string(),
                reason: "no entries in response".to_string(),
            })
    }
}

/// One authenticated session against an array
pub struct RestSession {
    http: reqwest::Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl RestSession {
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> TransportResult<T> {
        let url = format!("{}{}", self.base_url, path);
        trace!("GET {url}");

        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json().await.map_err(|e| TransportError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> TransportResult<T> {
        let url = format!("{}{}", self.base_url, path);
        trace!("POST {url}");

        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        response.json().await.map_err(|e| TransportError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ArraySession for RestSession {
    async fn query_point_in_time(&self, path: &str) -> TransportResult<Option<Value>> {
        let filter = format!("path EQ \"{path}\"");
        let result: Collection<MetricValueContent> = self
            .get_json("/api/types/metricValue/instances", &[("filter", filter)])
            .await?;

        // Entries are ordered newest first
        Ok(result
            .entries
            .into_iter()
            .next()
            .and_then(|e| e.content.values))
    }

    async fn register_continuous(
        &self,
        paths: &[String],
        interval_secs: u64,
    ) -> TransportResult<ContinuousQuery> {
        let body = json!({ "paths": paths, "interval": interval_secs });
        let created: Entry<RealTimeQueryContent> = self
            .post_json("/api/types/metricRealTimeQuery/instances", &body)
            .await?;

        Ok(ContinuousQuery {
            id: created.content.id,
            interval_secs: created.content.interval,
            paths: paths.to_vec(),
        })
    }

    async fn fetch_continuous(
        &self,
        query: &ContinuousQuery,
    ) -> TransportResult<Vec<Option<Value>>> {
        let filter = format!("queryId EQ {}", query.id);
        let result: Collection<QueryResultContent> = self
            .get_json("/api/types/metricQueryResult/instances", &[("filter", filter)])
            .await?;

        // Match results back to their paths; the array is not obliged to
        // return entries in registration order
        let mut by_path: HashMap<String, Value> = result
            .entries
            .into_iter()
            .filter_map(|e| match (e.content.path, e.content.values) {
                (Some(path), Some(values)) => Some((path, values)),
                _ => None,
            })
            .collect();

        Ok(query.paths.iter().map(|p| by_path.remove(p)).collect())
    }

    async fn pool_summaries(&self) -> TransportResult<Vec<PoolSummary>> {
        let fields = "id,name,sizeFree,sizeTotal,sizeUsed,sizeSubscribed".to_string();
        let result: Collection<PoolSummary> = self
            .get_json("/api/types/pool/instances", &[("fields", fields)])
            .await?;

        Ok(result.entries.into_iter().map(|e| e.content).collect())
    }

    async fn storage_resource_summaries(&self) -> TransportResult<Vec<StorageResourceSummary>> {
        let fields = "id,name,sizeAllocated,sizeTotal,sizeUsed".to_string();
        let result: Collection<StorageResourceSummary> = self
            .get_json("/api/types/storageResource/instances", &[("fields", fields)])
            .await?;

        Ok(result.entries.into_iter().map(|e| e.content).collect())
    }

    async fn close(&self) -> TransportResult<()> {
        let url = format!("{}/api/types/loginSessionInfo/action/logout", self.base_url);
        trace!("POST {url}");

        let mut request = self.http.post(&url).json(&json!({ "localCleanupOnly": true }));
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                path: "logout".to_string(),
            });
        }

        debug!("Session released");
        Ok(())
    }
}

/// Envelope for instance collections and single created instances
#[derive(Debug, Deserialize)]
struct Entry<T> {
    content: T,
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    entries: Vec<Entry<T>>,
}

#[derive(Debug, Deserialize)]
struct SystemInfo {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MetricValueContent {
    #[serde(default)]
    values: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RealTimeQueryContent {
    id: u64,
    interval: u64,
}

#[derive(Debug, Deserialize)]
struct QueryResultContent {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    values: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_collection_deserializes() {
        let raw = r#"{
            "entries": [
                {"content": {"id": "pool_1", "name": "Flash Pool",
                             "sizeFree": 100, "sizeTotal": 500,
                             "sizeUsed": 400, "sizeSubscribed": 600}}
            ]
        }"#;
        let parsed: Collection<PoolSummary> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        let pool = &parsed.entries[0].content;
        assert_eq!(pool.id, "pool_1");
        assert_eq!(pool.size_subscribed, 600);
    }

    #[test]
    fn test_metric_value_with_null_values() {
        let raw = r#"{"entries": [{"content": {"path": "sp.*.x", "values": null}}]}"#;
        let parsed: Collection<MetricValueContent> = serde_json::from_str(raw).unwrap();
        assert!(parsed.entries[0].content.values.is_none());
    }

    #[test]
    fn test_metric_value_unknown_fields_ignored() {
        let raw = r#"{
            "entries": [
                {"content": {"path": "sp.*.x", "timestamp": "2024-01-01T00:00:00Z",
                             "interval": 60, "values": {"spa": 1.0}}}
            ]
        }"#;
        let parsed: Collection<MetricValueContent> = serde_json::from_str(raw).unwrap();
        assert!(parsed.entries[0].content.values.is_some());
    }

    #[test]
    fn test_realtime_query_creation_response() {
        let raw = r#"{"content": {"id": 42, "interval": 60}}"#;
        let parsed: Entry<RealTimeQueryContent> = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content.id, 42);
        assert_eq!(parsed.content.interval, 60);
    }

    #[test]
    fn test_empty_collection_tolerated() {
        let raw = r#"{}"#;
        let parsed: Collection<MetricValueContent> = serde_json::from_str(raw).unwrap();
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_base_url_includes_port() {
        let target = TargetConfig {
            address: "unity01".to_string(),
            port: 8443,
            username: "monitor".to_string(),
            password: "secret".to_string(),
            name: None,
            insecure: true,
        };
        let client = RestClient::new(&target);
        assert_eq!(client.base_url, "https://unity01:8443");
    }
}
