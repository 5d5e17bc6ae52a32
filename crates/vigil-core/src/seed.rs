//! Built-in rule and metric sets, used when the configuration provides none.

use std::collections::HashMap;
use vigil_alert::engine::{AlertRule, CompareOp};
use vigil_common::types::Severity;
use vigil_metrics::{MetricDef, MetricKind};

fn rule(
    name: &str,
    description: &str,
    metric: &str,
    condition: CompareOp,
    threshold: f64,
    severity: Severity,
    min_breach_secs: u64,
) -> AlertRule {
    AlertRule {
        name: name.into(),
        description: description.into(),
        metric: metric.into(),
        condition,
        threshold,
        severity,
        min_breach_secs,
        enabled: true,
        labels: HashMap::new(),
        annotations: HashMap::new(),
    }
}

/// Default alert rules covering system resources, application performance,
/// and business signals.
pub fn default_rules() -> Vec<AlertRule> {
    let mut rules = vec![
        rule(
            "high_cpu_usage",
            "CPU usage too high",
            "system_cpu_usage",
            CompareOp::GreaterThan,
            80.0,
            Severity::Warning,
            300,
        ),
        rule(
            "high_memory_usage",
            "Memory usage too high",
            "system_memory_usage",
            CompareOp::GreaterThan,
            85.0,
            Severity::Warning,
            300,
        ),
        rule(
            "high_disk_usage",
            "Disk usage too high",
            "system_disk_usage",
            CompareOp::GreaterThan,
            90.0,
            Severity::Critical,
            60,
        ),
        rule(
            "high_error_rate",
            "Error rate too high",
            "error_rate",
            CompareOp::GreaterThan,
            5.0,
            Severity::Warning,
            180,
        ),
        rule(
            "slow_response_time",
            "Response time too slow",
            "response_time_95th",
            CompareOp::GreaterThan,
            5.0,
            Severity::Warning,
            300,
        ),
        rule(
            "low_throughput",
            "Throughput too low",
            "throughput_qps",
            CompareOp::LessThan,
            1.0,
            Severity::Info,
            600,
        ),
        rule(
            "too_many_websocket_connections",
            "Too many websocket connections",
            "websocket_connections",
            CompareOp::GreaterThan,
            100.0,
            Severity::Warning,
            60,
        ),
    ];

    if let Some(cpu) = rules.first_mut() {
        cpu.annotations.insert(
            "summary".into(),
            "CPU usage above 80% for 5 minutes".into(),
        );
    }
    rules
}

/// Default metric definitions: business, system, and application signals.
pub fn default_metrics() -> Vec<MetricDef> {
    vec![
        // Business metrics
        MetricDef::new(
            "reports_generated_total",
            MetricKind::Counter,
            "Total reports generated",
        ),
        MetricDef::new("active_users_count", MetricKind::Gauge, "Active user count"),
        MetricDef::new("api_requests_total", MetricKind::Counter, "Total API requests")
            .with_labels(&["method", "endpoint"]),
        MetricDef::new(
            "websocket_connections",
            MetricKind::Gauge,
            "Open websocket connections",
        ),
        MetricDef::new(
            "data_processing_duration",
            MetricKind::Histogram,
            "Data processing duration in seconds",
        ),
        // System metrics
        MetricDef::new("system_cpu_usage", MetricKind::Gauge, "System CPU usage percent"),
        MetricDef::new(
            "system_memory_usage",
            MetricKind::Gauge,
            "System memory usage percent",
        ),
        MetricDef::new("system_disk_usage", MetricKind::Gauge, "System disk usage percent"),
        MetricDef::new(
            "database_connections",
            MetricKind::Gauge,
            "Open database connections",
        ),
        MetricDef::new("cache_hit_ratio", MetricKind::Gauge, "Cache hit ratio percent"),
        // Application metrics
        MetricDef::new("error_rate", MetricKind::Gauge, "Request error rate percent"),
        MetricDef::new(
            "response_time_95th",
            MetricKind::Gauge,
            "95th percentile response time",
        ),
        MetricDef::new("throughput_qps", MetricKind::Gauge, "Throughput in queries/sec"),
        MetricDef::new("queue_size", MetricKind::Gauge, "Task queue size"),
    ]
}
