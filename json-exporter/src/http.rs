//! HTTP server exposing the probe and exporter metrics endpoints.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::error::ProbeError;
use crate::probe::ProbeClient;
use crate::stats::SharedMetrics;

/// Content type of OpenMetrics text responses.
pub const OPENMETRICS_CONTENT_TYPE: &str =
    "application/openmetrics-text; version=1.0.0; charset=utf-8";

const INDEX_HTML: &str = r#"<html>
<head><title>Json Exporter</title></head>
<body>
<h1>Json Exporter</h1>
<p><a href="/probe">Run a probe</a></p>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    client: ProbeClient,
    metrics: SharedMetrics,
}

/// Query parameters of `/probe`.
#[derive(Debug, Default, Deserialize)]
struct ProbeParams {
    target: Option<String>,
    prefix: Option<String>,
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        (self.status_code(), format!("{}\n", self)).into_response()
    }
}

/// Create the HTTP router.
pub fn create_router(client: ProbeClient, metrics: SharedMetrics) -> Router {
    let state = AppState { client, metrics };

    Router::new()
        .route("/", get(index_handler))
        .route("/probe", get(probe_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the / endpoint.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Handler for the /probe endpoint.
async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> Response {
    let target = params.target.as_deref().unwrap_or_default();
    let prefix = params.prefix.as_deref().unwrap_or_default();

    let result = if target.is_empty() {
        Err(ProbeError::MissingTarget)
    } else {
        state.client.probe(target, prefix).await
    };
    state.metrics.observe(&result);

    match result {
        Ok(output) => {
            info!(
                url = target,
                series = output.gauges.len(),
                "Probe succeeded"
            );
            (
                StatusCode::OK,
                [("content-type", OPENMETRICS_CONTENT_TYPE)],
                output.body,
            )
                .into_response()
        }
        Err(e) => {
            warn!(url = target, error = %e, "Probe failed");
            e.into_response()
        }
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", OPENMETRICS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => ProbeError::from(e).into_response(),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server configuration.
pub struct HttpServer {
    client: ProbeClient,
    metrics: SharedMetrics,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(client: ProbeClient, metrics: SharedMetrics, listen_addr: SocketAddr) -> Self {
        Self {
            client,
            metrics,
            listen_addr,
        }
    }

    /// Bind the configured address and serve until the shutdown signal is received.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(addr = %self.listen_addr, "Starting HTTP server");

        let listener = TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal is received.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let router = create_router(self.client, self.metrics);

        info!(addr = %listener.local_addr()?, "HTTP server listening");

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProbeConfig;
    use crate::stats::ExporterMetrics;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn make_router() -> (Router, SharedMetrics) {
        let client = ProbeClient::new(&ProbeConfig {
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();
        let metrics = Arc::new(ExporterMetrics::new());
        (create_router(client, metrics.clone()), metrics)
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_endpoint() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("<a href=\"/probe\">"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_probe_without_target() {
        let (router, metrics) = make_router();

        let response = router
            .clone()
            .oneshot(Request::get("/probe").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Target parameter is missing\n");

        let response = router
            .oneshot(Request::get("/probe?target=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert_eq!(metrics.failures("missing_target"), 2);
    }

    #[tokio::test]
    async fn test_probe_unreachable_target() {
        let (router, metrics) = make_router();

        let response = router
            .oneshot(
                Request::get("/probe?target=http://127.0.0.1:1/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.starts_with("Failed to fetch"));
        assert_eq!(metrics.failures("fetch"), 1);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (router, _) = make_router();

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("openmetrics-text"));
        assert!(body_string(response).await.contains("json_exporter_probes_total 0"));
    }
}
