//! Metrics describing the exporter itself, served on `/metrics`.

use std::sync::Arc;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

use crate::collector::LabelSet;
use crate::error::ProbeError;
use crate::probe::ProbeOutput;

/// Prefix of every self-metric.
pub const METRIC_PREFIX: &str = "json_exporter";

/// Process-lifetime exporter metrics.
///
/// Only aggregate counters live here; probed series are never retained.
#[derive(Debug)]
pub struct ExporterMetrics {
    registry: Registry,
    probes: Counter,
    probe_failures: Family<LabelSet, Counter>,
    probe_series: Gauge,
    rejected_observations: Counter,
}

/// Shareable handle to the exporter metrics.
pub type SharedMetrics = Arc<ExporterMetrics>;

impl ExporterMetrics {
    /// Create and register all exporter metrics.
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(METRIC_PREFIX);

        let probes = Counter::default();
        registry.register("probes", "Probes received", probes.clone());

        let probe_failures = Family::<LabelSet, Counter>::default();
        registry.register(
            "probe_failures",
            "Probes that failed, by reason",
            probe_failures.clone(),
        );

        let probe_series = Gauge::default();
        registry.register(
            "probe_series",
            "Series produced by the last successful probe",
            probe_series.clone(),
        );

        let rejected_observations = Counter::default();
        registry.register(
            "rejected_observations",
            "Values dropped because their index depth did not match their series",
            rejected_observations.clone(),
        );

        Self {
            registry,
            probes,
            probe_failures,
            probe_series,
            rejected_observations,
        }
    }

    /// Account for a finished probe.
    pub fn observe(&self, result: &Result<ProbeOutput, ProbeError>) {
        self.probes.inc();

        match result {
            Ok(output) => {
                self.probe_series.set(output.gauges.len() as i64);
                self.rejected_observations
                    .inc_by(output.gauges.rejected_observations());
            }
            Err(e) => {
                self.probe_failures
                    .get_or_create(&vec![("reason".to_string(), e.reason().to_string())])
                    .inc();
            }
        }
    }

    /// Total probes observed.
    pub fn probes(&self) -> u64 {
        self.probes.get()
    }

    /// Failures observed for `reason`.
    pub fn failures(&self, reason: &str) -> u64 {
        self.probe_failures
            .get_or_create(&vec![("reason".to_string(), reason.to_string())])
            .get()
    }

    /// Render in OpenMetrics text format.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for ExporterMetrics {
    fn default() -> Self {
        Self::new()
    }
}
