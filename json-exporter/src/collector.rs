//! Gauge collector that turns walker observations into registered series.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::atomic::AtomicU64;

use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use serde_json::Value;
use tracing::{trace, warn};

use crate::walker::{Receiver, walk_json};

/// Help text attached to every probed series.
pub const HELP: &str = "Retrieved value";

/// Floating point gauge as stored in the registry.
pub type FloatGauge = Gauge<f64, AtomicU64>;

/// Label set used by labelled series.
pub type LabelSet = Vec<(String, String)>;

/// Name of the label carrying the index of the array at `depth`.
pub fn index_label(depth: usize) -> String {
    format!("array_{}_index", depth)
}

/// Registry handle backing a series.
#[derive(Debug, Clone)]
enum GaugeHandle {
    /// Series without any array index labels.
    Plain(FloatGauge),
    /// Series with one label per enclosing array.
    Labelled(Family<LabelSet, FloatGauge>),
}

/// A single named gauge series.
#[derive(Debug, Clone)]
pub struct GaugeSeries {
    label_names: Vec<String>,
    values: BTreeMap<Vec<String>, f64>,
    handle: GaugeHandle,
}

impl GaugeSeries {
    fn new(depth: usize) -> Self {
        let label_names: Vec<String> = (0..depth).map(index_label).collect();
        let handle = if label_names.is_empty() {
            GaugeHandle::Plain(FloatGauge::default())
        } else {
            GaugeHandle::Labelled(Family::default())
        };

        Self {
            label_names,
            values: BTreeMap::new(),
            handle,
        }
    }

    fn register(&self, name: &str, registry: &mut Registry) {
        match &self.handle {
            GaugeHandle::Plain(gauge) => registry.register(name, HELP, gauge.clone()),
            GaugeHandle::Labelled(family) => registry.register(name, HELP, family.clone()),
        }
    }

    fn set(&mut self, indices: &[usize], value: f64) {
        let label_values: Vec<String> = indices.iter().map(|i| i.to_string()).collect();

        match &self.handle {
            GaugeHandle::Plain(gauge) => {
                gauge.set(value);
            }
            GaugeHandle::Labelled(family) => {
                let labels: LabelSet = self
                    .label_names
                    .iter()
                    .cloned()
                    .zip(label_values.iter().cloned())
                    .collect();
                family.get_or_create(&labels).set(value);
            }
        }

        self.values.insert(label_values, value);
    }

    /// Label names, ordered by array depth.
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// Recorded values keyed by label values (same order as [`Self::label_names`]).
    pub fn values(&self) -> &BTreeMap<Vec<String>, f64> {
        &self.values
    }

    /// Look up the value recorded for a label value combination.
    pub fn value(&self, label_values: &[&str]) -> Option<f64> {
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.values.get(&key).copied()
    }
}

/// Outcome of a flatten-and-collect pass.
#[derive(Debug, Clone, Default)]
pub struct GaugeSet {
    series: BTreeMap<String, GaugeSeries>,
    observations: u64,
    rejected_observations: u64,
}

impl GaugeSet {
    /// Number of distinct series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether no series were produced.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Look up a series by flattened name.
    pub fn get(&self, name: &str) -> Option<&GaugeSeries> {
        self.series.get(name)
    }

    /// Iterate series in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GaugeSeries)> {
        self.series.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Series names in order.
    pub fn names(&self) -> Vec<&str> {
        self.series.keys().map(String::as_str).collect()
    }

    /// Observations accepted into a series.
    pub fn observations(&self) -> u64 {
        self.observations
    }

    /// Observations dropped because they had no name or their index depth did
    /// not match the series.
    pub fn rejected_observations(&self) -> u64 {
        self.rejected_observations
    }
}

/// Collects walker observations into gauges registered in a caller-owned registry.
///
/// One collector serves exactly one document. Series are created on the first
/// observation of a name and keep the label layout of that observation.
#[derive(Debug)]
pub struct GaugeCollector<'a> {
    registry: &'a mut Registry,
    set: GaugeSet,
}

impl<'a> GaugeCollector<'a> {
    /// Create an empty collector registering into `registry`.
    pub fn new(registry: &'a mut Registry) -> Self {
        Self {
            registry,
            set: GaugeSet::default(),
        }
    }

    /// Finish collecting and return the collected series.
    pub fn finish(self) -> GaugeSet {
        self.set
    }

    /// Record one observation.
    pub fn collect(&mut self, name: &str, value: f64, indices: &[usize]) {
        // A scalar document without a prefix has no name to export under.
        if name.is_empty() {
            warn!(value, "Value has no metric name, dropping value");
            self.set.rejected_observations += 1;
            return;
        }

        let series = match self.set.series.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let series = GaugeSeries::new(indices.len());
                series.register(name, self.registry);
                trace!(name, labels = indices.len(), "Registered series");
                entry.insert(series)
            }
        };

        if series.label_names.len() != indices.len() {
            warn!(
                name,
                expected = series.label_names.len(),
                actual = indices.len(),
                "Index depth does not match existing series, dropping value"
            );
            self.set.rejected_observations += 1;
            return;
        }

        series.set(indices, value);
        self.set.observations += 1;
    }
}

impl Receiver for GaugeCollector<'_> {
    fn receive(&mut self, name: &str, value: f64, indices: &[usize]) {
        self.collect(name, value, indices);
    }
}

/// Flatten `value` under `prefix` and register the resulting gauges in `registry`.
pub fn collect_json(prefix: &str, value: &Value, registry: &mut Registry) -> GaugeSet {
    let mut collector = GaugeCollector::new(registry);
    walk_json(prefix, value, &[], &mut collector);
    collector.finish()
}
