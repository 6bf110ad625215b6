use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use log::{error, info};
use prometheus::{Encoder, Registry, TextEncoder};
use tokio::net::TcpListener;

use crate::error::{ExporterError, Result};

/// Render a registry's current state in the prometheus text format
pub fn render(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buffer)
        .map_err(|e| ExporterError::Exposition(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ExporterError::Exposition(e.to_string()))
}

/// Serve the exposition endpoint until the process exits
pub async fn serve(port: u16, registry: Registry) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(registry);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| ExporterError::Exposition(format!("listening on {addr}: {e}")))?;

    info!("Serving metrics on http://{addr}/metrics");

    axum::serve(listener, app)
        .await
        .map_err(|e| ExporterError::Exposition(e.to_string()))
}

/// GET /metrics - prometheus text format
async fn metrics_handler(State(registry): State<Registry>) -> impl IntoResponse {
    match render(&registry) {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "encoding error".to_string(),
            )
        }
    }
}

/// GET /healthz - liveness probe
async fn healthz_handler() -> &'static str {
    "ok"
}
