//! Fetching targets and turning their JSON documents into exposition text.

use std::time::Duration;

use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use serde_json::Value;
use tracing::debug;

use crate::collector::{GaugeSet, collect_json};
use crate::config::ProbeConfig;
use crate::error::{ProbeError, Result};

/// Result of a successful probe.
#[derive(Debug)]
pub struct ProbeOutput {
    /// OpenMetrics text for the probed document.
    pub body: String,
    /// Structured series behind `body`.
    pub gauges: GaugeSet,
}

/// HTTP client shared by all probes.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ProbeClient {
    client: reqwest::Client,
}

impl ProbeClient {
    /// Build a client from configuration.
    pub fn new(config: &ProbeConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .pool_max_idle_per_host(config.max_idle_connections)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch `target` and decode its body as JSON.
    ///
    /// The response status is not checked; any body that parses is accepted.
    pub async fn fetch(&self, target: &str) -> Result<Value> {
        let response = self
            .client
            .get(target)
            .send()
            .await
            .map_err(|e| ProbeError::fetch(target, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = target, %status, "Target answered with non-success status");
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProbeError::fetch(target, e))?;

        serde_json::from_slice(&bytes).map_err(|e| ProbeError::decode(target, e))
    }

    /// Fetch `target` and flatten it into a fresh registry.
    pub async fn probe(&self, target: &str, prefix: &str) -> Result<ProbeOutput> {
        let document = self.fetch(target).await?;
        render(prefix, &document)
    }
}

/// Flatten `document` into a fresh registry and encode it.
pub fn render(prefix: &str, document: &Value) -> Result<ProbeOutput> {
    let mut registry = Registry::default();
    let gauges = collect_json(prefix, document, &mut registry);

    let mut body = String::new();
    encode(&mut body, &registry)?;

    debug!(
        series = gauges.len(),
        observations = gauges.observations(),
        rejected = gauges.rejected_observations(),
        "Rendered probe"
    );

    Ok(ProbeOutput { body, gauges })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_prefix() {
        let output = render("svc", &json!({"up": true, "queue": [3, 4]})).unwrap();

        assert_eq!(output.gauges.names(), vec!["svc::queue::array_0", "svc::up"]);
        assert!(output.body.contains("# TYPE svc::up gauge"));
        assert!(output.body.contains("array_0_index=\"1\""));
        assert!(output.body.ends_with("# EOF\n"));
    }

    #[test]
    fn test_render_empty_document() {
        let output = render("", &json!({"status": "ok"})).unwrap();
        assert!(output.gauges.is_empty());
        assert_eq!(output.body, "# EOF\n");
    }

    #[test]
    fn test_render_root_scalar_without_prefix() {
        let output = render("", &json!(42)).unwrap();
        assert!(output.gauges.is_empty());
        assert_eq!(output.gauges.rejected_observations(), 1);
        assert_eq!(output.body, "# EOF\n");
    }

    #[test]
    fn test_client_from_default_config() {
        assert!(ProbeClient::new(&ProbeConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_target() {
        let client = ProbeClient::new(&ProbeConfig {
            timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let err = client.fetch("http://127.0.0.1:1/").await.unwrap_err();
        assert_eq!(err.reason(), "fetch");
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let client = ProbeClient::new(&ProbeConfig::default()).unwrap();

        let err = client.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ProbeError::Fetch { .. }));
    }
}
