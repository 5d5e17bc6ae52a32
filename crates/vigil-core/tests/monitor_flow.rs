use chrono::{Duration, Utc};
use std::collections::HashMap;
use vigil_alert::engine::{AlertRule, CompareOp};
use vigil_common::types::{AlertStatus, SecurityEvent, SecurityEventKind, Severity};
use vigil_core::{Monitor, MonitorConfig};

fn cpu_rule(min_breach_secs: u64) -> AlertRule {
    AlertRule {
        name: "cpu_high".into(),
        description: "CPU usage too high".into(),
        metric: "system_cpu_usage".into(),
        condition: CompareOp::GreaterThan,
        threshold: 80.0,
        severity: Severity::Warning,
        min_breach_secs,
        enabled: true,
        labels: HashMap::new(),
        annotations: HashMap::new(),
    }
}

/// Test config: explicit rules (no default seeding), no channels, and an
/// evaluation interval long enough that the background task never interferes
/// with the synthetic clock driven through `evaluate_once`.
fn test_config(rules: Vec<AlertRule>) -> MonitorConfig {
    MonitorConfig {
        evaluation_interval_secs: 3600,
        rules,
        ..MonitorConfig::default()
    }
}

fn login_failure(identifier: &str, at: chrono::DateTime<Utc>) -> SecurityEvent {
    SecurityEvent {
        kind: SecurityEventKind::LoginFailure,
        identifier: identifier.into(),
        metadata: HashMap::new(),
        timestamp: at,
    }
}

#[tokio::test]
async fn metric_breach_creates_and_resolves_alert() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(0)])).unwrap();
    let now = Utc::now();

    monitor.push_metric("system_cpu_usage", 85.0, &HashMap::new());
    monitor.evaluate_once(now);

    let active = monitor.get_active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].rule_name, "cpu_high");
    assert_eq!(active[0].status, AlertStatus::Active);
    assert_eq!(active[0].value, 85.0);

    // Recovery resolves the alert exactly once.
    monitor.push_metric("system_cpu_usage", 50.0, &HashMap::new());
    monitor.evaluate_once(now + Duration::seconds(30));
    assert!(monitor.get_active_alerts().is_empty());

    let history = monitor.get_alert_history(1);
    assert_eq!(history[0].status, AlertStatus::Resolved);

    // Further clear samples are no-ops.
    monitor.evaluate_once(now + Duration::seconds(60));
    assert_eq!(monitor.get_alert_history(10).len(), 2);

    monitor.shutdown().await;
}

#[tokio::test]
async fn breach_must_be_sustained_before_alerting() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(300)])).unwrap();
    let t0 = Utc::now();

    monitor.push_metric("system_cpu_usage", 85.0, &HashMap::new());

    for offset in [0, 100, 200, 290] {
        monitor.evaluate_once(t0 + Duration::seconds(offset));
        assert!(
            monitor.get_active_alerts().is_empty(),
            "no alert expected at t={offset}"
        );
    }

    monitor.evaluate_once(t0 + Duration::seconds(310));
    let active = monitor.get_active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].rule_name, "cpu_high");

    // Intermediate cycles must not have produced extra alerts.
    assert_eq!(monitor.get_alert_history(10).len(), 1);

    monitor.shutdown().await;
}

#[tokio::test]
async fn silenced_alert_reverts_on_the_evaluation_clock() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(0)])).unwrap();
    let t0 = Utc::now();

    monitor.push_metric("system_cpu_usage", 85.0, &HashMap::new());
    monitor.evaluate_once(t0);
    assert_eq!(monitor.get_active_alerts().len(), 1);

    monitor.silence_alert("cpu_high", 60).unwrap();
    assert_eq!(monitor.get_active_alerts()[0].status, AlertStatus::Silenced);

    // A breaching cycle while silenced must not re-trigger or flip status.
    monitor.evaluate_once(t0 + Duration::seconds(10));
    assert_eq!(monitor.get_active_alerts()[0].status, AlertStatus::Silenced);
    assert_eq!(monitor.get_alert_history(10).len(), 1);

    // Well past the deadline the alert reverts to active.
    monitor.evaluate_once(t0 + Duration::seconds(120));
    assert_eq!(monitor.get_active_alerts()[0].status, AlertStatus::Active);

    monitor.shutdown().await;
}

#[tokio::test]
async fn removing_a_rule_force_resolves_its_alert() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(0)])).unwrap();

    monitor.push_metric("system_cpu_usage", 85.0, &HashMap::new());
    monitor.evaluate_once(Utc::now());
    assert_eq!(monitor.get_active_alerts().len(), 1);

    assert!(monitor.remove_rule("cpu_high"));
    assert!(monitor.get_active_alerts().is_empty());
    assert_eq!(monitor.get_alert_history(1)[0].status, AlertStatus::Resolved);

    assert!(!monitor.remove_rule("cpu_high"), "second removal reports unknown rule");
    assert!(monitor.get_rule_status().is_empty());

    monitor.shutdown().await;
}

#[tokio::test]
async fn brute_force_login_raises_and_later_resolves_a_threat_alert() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(300)])).unwrap();
    let t0 = Utc::now();

    // Four failures within the window: below threshold, nothing raised.
    for i in 0..4 {
        monitor.push_security_event(&login_failure(
            "203.0.113.7",
            t0 + Duration::seconds(i * 30),
        ));
    }
    assert!(monitor.get_active_alerts().is_empty());

    // The fifth crosses the threshold inline with the event.
    monitor.push_security_event(&login_failure("203.0.113.7", t0 + Duration::seconds(120)));
    let active = monitor.get_active_alerts();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].rule_name, "threat:brute_force:203.0.113.7");
    assert_eq!(active[0].severity, Severity::Critical);
    assert_eq!(active[0].labels.get("identifier").unwrap(), "203.0.113.7");

    // Once the window decays, the periodic sweep resolves the alert.
    monitor.evaluate_once(t0 + Duration::seconds(500));
    assert!(monitor.get_active_alerts().is_empty());
    assert_eq!(
        monitor.get_alert_history(1)[0].status,
        AlertStatus::Resolved
    );

    monitor.shutdown().await;
}

#[tokio::test]
async fn separate_identifiers_get_separate_threat_alerts() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(300)])).unwrap();
    let t0 = Utc::now();

    for ip in ["10.0.0.1", "10.0.0.2"] {
        for i in 0..5 {
            monitor.push_security_event(&login_failure(ip, t0 + Duration::seconds(i)));
        }
    }

    let mut names: Vec<String> = monitor
        .get_active_alerts()
        .into_iter()
        .map(|a| a.rule_name)
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "threat:brute_force:10.0.0.1".to_string(),
            "threat:brute_force:10.0.0.2".to_string(),
        ]
    );

    monitor.shutdown().await;
}

#[tokio::test]
async fn dispatcher_counters_are_published_as_metrics() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(0)])).unwrap();

    monitor.evaluate_once(Utc::now());
    let none = HashMap::new();
    assert_eq!(
        monitor.metrics().get("notification_failures_total", &none),
        Some(0.0)
    );
    assert_eq!(monitor.metrics().get("active_alerts_count", &none), Some(0.0));

    monitor.shutdown().await;
}

#[tokio::test]
async fn unknown_metric_pushes_never_fail() {
    let monitor = Monitor::start(test_config(vec![cpu_rule(0)])).unwrap();

    monitor.push_metric("not_registered_anywhere", 1.0, &HashMap::new());
    monitor.evaluate_once(Utc::now());
    assert!(monitor.get_active_alerts().is_empty());

    monitor.shutdown().await;
}

#[tokio::test]
async fn default_rules_are_seeded_when_config_has_none() {
    let monitor = Monitor::start(test_config(vec![])).unwrap();

    let status = monitor.get_rule_status();
    assert!(status.contains_key("high_cpu_usage"));
    assert!(status.contains_key("high_disk_usage"));
    assert!(status.values().all(|s| s.enabled));

    monitor.shutdown().await;
}
