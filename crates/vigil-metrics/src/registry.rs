use crate::MetricError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use vigil_common::types::MetricSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Counter => write!(f, "counter"),
            MetricKind::Gauge => write!(f, "gauge"),
            MetricKind::Histogram => write!(f, "histogram"),
        }
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counter" => Ok(MetricKind::Counter),
            "gauge" => Ok(MetricKind::Gauge),
            "histogram" => Ok(MetricKind::Histogram),
            _ => Err(format!("unknown metric kind: {s}")),
        }
    }
}

/// Definition of a named metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDef {
    pub name: String,
    pub kind: MetricKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub label_names: Vec<String>,
}

impl MetricDef {
    pub fn new(name: &str, kind: MetricKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            label_names: Vec::new(),
        }
    }

    pub fn with_labels(mut self, label_names: &[&str]) -> Self {
        self.label_names = label_names.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
enum SeriesValue {
    Counter(f64),
    Gauge(f64),
    Histogram { count: u64, sum: f64 },
}

impl SeriesValue {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => SeriesValue::Counter(0.0),
            MetricKind::Gauge => SeriesValue::Gauge(0.0),
            MetricKind::Histogram => SeriesValue::Histogram { count: 0, sum: 0.0 },
        }
    }

    /// Snapshot value: counters and gauges report their current value,
    /// histograms their running mean.
    fn value(&self) -> f64 {
        match self {
            SeriesValue::Counter(v) | SeriesValue::Gauge(v) => *v,
            SeriesValue::Histogram { count: 0, .. } => 0.0,
            SeriesValue::Histogram { count, sum } => sum / *count as f64,
        }
    }
}

#[derive(Debug, Clone)]
struct Series {
    labels: HashMap<String, String>,
    value: SeriesValue,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    defs: HashMap<String, MetricDef>,
    /// metric name -> label key -> series
    series: HashMap<String, HashMap<String, Series>>,
}

/// Thread-safe registry of metric definitions and current values.
///
/// All methods take `&self`; the registry is shared between collaborators
/// behind an `Arc` and guards its state with a single `RwLock`, so
/// `snapshot()` always observes a consistent point-in-time copy.
#[derive(Default)]
pub struct MetricRegistry {
    inner: RwLock<Inner>,
}

/// Stable key for one label combination within a metric.
fn label_key(labels: &HashMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(",")
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric definition. Fails if the name is already taken.
    pub fn register(&self, def: MetricDef) -> crate::Result<()> {
        let mut inner = self.inner.write().unwrap();
        if inner.defs.contains_key(&def.name) {
            return Err(MetricError::DuplicateMetric(def.name));
        }
        tracing::debug!(metric = %def.name, kind = %def.kind, "Metric registered");
        inner.series.insert(def.name.clone(), HashMap::new());
        inner.defs.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.inner.read().unwrap().defs.get(name).map(|d| d.kind)
    }

    /// Set a gauge to an absolute value. Logged no-op if `name` is unknown
    /// or not a gauge.
    pub fn set(&self, name: &str, value: f64, labels: &HashMap<String, String>) {
        self.update(name, labels, |kind, slot| match (kind, slot) {
            (MetricKind::Gauge, SeriesValue::Gauge(v)) => {
                *v = value;
                true
            }
            _ => false,
        });
    }

    /// Add `delta` to a counter. Logged no-op if `name` is unknown or not a
    /// counter.
    pub fn increment(&self, name: &str, delta: f64, labels: &HashMap<String, String>) {
        self.update(name, labels, |kind, slot| match (kind, slot) {
            (MetricKind::Counter, SeriesValue::Counter(v)) => {
                *v += delta;
                true
            }
            _ => false,
        });
    }

    /// Record one observation into a histogram. Logged no-op if `name` is
    /// unknown or not a histogram.
    pub fn observe(&self, name: &str, value: f64, labels: &HashMap<String, String>) {
        self.update(name, labels, |kind, slot| match (kind, slot) {
            (MetricKind::Histogram, SeriesValue::Histogram { count, sum }) => {
                *count += 1;
                *sum += value;
                true
            }
            _ => false,
        });
    }

    /// Single ingestion entry point: dispatches on the registered kind.
    /// Counters are incremented by `value`, gauges set, histograms observed.
    pub fn record(&self, name: &str, value: f64, labels: &HashMap<String, String>) {
        match self.kind_of(name) {
            Some(MetricKind::Counter) => self.increment(name, value, labels),
            Some(MetricKind::Gauge) => self.set(name, value, labels),
            Some(MetricKind::Histogram) => self.observe(name, value, labels),
            None => {
                tracing::warn!(metric = name, "Dropping sample for unknown metric");
            }
        }
    }

    fn update<F>(&self, name: &str, labels: &HashMap<String, String>, apply: F)
    where
        F: FnOnce(MetricKind, &mut SeriesValue) -> bool,
    {
        let mut inner = self.inner.write().unwrap();
        let Some(kind) = inner.defs.get(name).map(|d| d.kind) else {
            tracing::warn!(metric = name, "Dropping write to unknown metric");
            return;
        };
        let key = label_key(labels);
        let Some(series_map) = inner.series.get_mut(name) else {
            return;
        };
        let series = series_map
            .entry(key)
            .or_insert_with(|| Series {
                labels: labels.clone(),
                value: SeriesValue::new(kind),
                updated_at: Utc::now(),
            });
        if apply(kind, &mut series.value) {
            series.updated_at = Utc::now();
        } else {
            tracing::warn!(metric = name, kind = %kind, "Dropping write with mismatched metric kind");
        }
    }

    /// Current value of one series, mainly for tests and introspection.
    pub fn get(&self, name: &str, labels: &HashMap<String, String>) -> Option<f64> {
        let inner = self.inner.read().unwrap();
        inner
            .series
            .get(name)?
            .get(&label_key(labels))
            .map(|s| s.value.value())
    }

    /// Consistent point-in-time copy of every series as metric samples.
    pub fn snapshot(&self) -> Vec<MetricSample> {
        let inner = self.inner.read().unwrap();
        let mut samples = Vec::new();
        for (name, series_map) in &inner.series {
            for series in series_map.values() {
                samples.push(MetricSample {
                    name: name.clone(),
                    value: series.value.value(),
                    labels: series.labels.clone(),
                    timestamp: series.updated_at,
                });
            }
        }
        samples
    }

    pub fn metric_names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        inner.defs.keys().cloned().collect()
    }
}
