use crate::registry::{MetricDef, MetricKind, MetricRegistry};
use crate::MetricError;
use std::collections::HashMap;

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn register_rejects_duplicate_names() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new("api_requests_total", MetricKind::Counter, "API requests"))
        .unwrap();

    let err = registry
        .register(MetricDef::new("api_requests_total", MetricKind::Gauge, ""))
        .unwrap_err();
    assert!(matches!(err, MetricError::DuplicateMetric(name) if name == "api_requests_total"));
}

#[test]
fn writes_to_unknown_metrics_are_no_ops() {
    let registry = MetricRegistry::new();
    // None of these may panic or create state.
    registry.set("missing", 1.0, &HashMap::new());
    registry.increment("missing", 1.0, &HashMap::new());
    registry.observe("missing", 1.0, &HashMap::new());
    registry.record("missing", 1.0, &HashMap::new());
    assert!(registry.snapshot().is_empty());
}

#[test]
fn counter_accumulates() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new("reports_generated_total", MetricKind::Counter, ""))
        .unwrap();

    registry.increment("reports_generated_total", 1.0, &HashMap::new());
    registry.increment("reports_generated_total", 2.0, &HashMap::new());
    assert_eq!(registry.get("reports_generated_total", &HashMap::new()), Some(3.0));
}

#[test]
fn gauge_set_replaces_value() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new("system_cpu_usage", MetricKind::Gauge, ""))
        .unwrap();

    registry.set("system_cpu_usage", 45.0, &HashMap::new());
    registry.set("system_cpu_usage", 85.0, &HashMap::new());
    assert_eq!(registry.get("system_cpu_usage", &HashMap::new()), Some(85.0));
}

#[test]
fn kind_mismatch_is_a_no_op() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new("system_cpu_usage", MetricKind::Gauge, ""))
        .unwrap();

    registry.set("system_cpu_usage", 45.0, &HashMap::new());
    // increment() on a gauge must not change it
    registry.increment("system_cpu_usage", 10.0, &HashMap::new());
    assert_eq!(registry.get("system_cpu_usage", &HashMap::new()), Some(45.0));
}

#[test]
fn histogram_snapshots_as_running_mean() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new(
            "data_processing_duration",
            MetricKind::Histogram,
            "",
        ))
        .unwrap();

    registry.observe("data_processing_duration", 1.0, &HashMap::new());
    registry.observe("data_processing_duration", 3.0, &HashMap::new());
    assert_eq!(registry.get("data_processing_duration", &HashMap::new()), Some(2.0));
}

#[test]
fn labeled_series_are_independent() {
    let registry = MetricRegistry::new();
    registry
        .register(
            MetricDef::new("api_requests_total", MetricKind::Counter, "")
                .with_labels(&["endpoint"]),
        )
        .unwrap();

    let reports = labels(&[("endpoint", "/reports")]);
    let charts = labels(&[("endpoint", "/charts")]);
    registry.increment("api_requests_total", 5.0, &reports);
    registry.increment("api_requests_total", 1.0, &charts);

    assert_eq!(registry.get("api_requests_total", &reports), Some(5.0));
    assert_eq!(registry.get("api_requests_total", &charts), Some(1.0));

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.iter().all(|s| s.name == "api_requests_total"));
}

#[test]
fn record_dispatches_on_registered_kind() {
    let registry = MetricRegistry::new();
    registry
        .register(MetricDef::new("api_requests_total", MetricKind::Counter, ""))
        .unwrap();
    registry
        .register(MetricDef::new("system_cpu_usage", MetricKind::Gauge, ""))
        .unwrap();

    registry.record("api_requests_total", 1.0, &HashMap::new());
    registry.record("api_requests_total", 1.0, &HashMap::new());
    registry.record("system_cpu_usage", 77.0, &HashMap::new());

    assert_eq!(registry.get("api_requests_total", &HashMap::new()), Some(2.0));
    assert_eq!(registry.get("system_cpu_usage", &HashMap::new()), Some(77.0));
}
