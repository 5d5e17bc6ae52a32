use crate::channels::{Channel, ChannelConfig, ChatWebhookChannel, WebhookChannel};
use crate::dispatcher::NotificationDispatcher;
use chrono::Utc;
use std::collections::HashMap;
use vigil_common::types::{Alert, AlertStatus, Severity};

fn make_alert(rule_name: &str, severity: Severity) -> Alert {
    Alert {
        id: "4242".into(),
        rule_name: rule_name.into(),
        message: format!("{rule_name} breached"),
        severity,
        status: AlertStatus::Active,
        value: 95.0,
        labels: HashMap::new(),
        annotations: HashMap::new(),
        created_at: Utc::now(),
        resolved_at: None,
        silenced_until: None,
    }
}

/// Webhook channel pointing at a closed local port: connects are refused
/// immediately, giving a deterministic send failure without a network.
fn failing_webhook() -> Channel {
    Channel::build(&ChannelConfig::Webhook(crate::channels::WebhookConfig {
        url: "http://127.0.0.1:1/hook".into(),
        headers: HashMap::new(),
    }))
    .unwrap()
}

// ── Channel configuration ──

#[test]
fn channel_config_parses_tagged_toml() {
    let toml_str = r#"
        type = "webhook"
        url = "https://hooks.example.com/vigil"

        [headers]
        authorization = "Bearer token"
    "#;
    let config: ChannelConfig = toml::from_str(toml_str).unwrap();
    let ChannelConfig::Webhook(cfg) = &config else {
        panic!("expected webhook config");
    };
    assert_eq!(cfg.url, "https://hooks.example.com/vigil");
    assert_eq!(cfg.headers.get("authorization").unwrap(), "Bearer token");
    assert_eq!(Channel::build(&config).unwrap().kind(), "webhook");
}

#[test]
fn email_config_requires_valid_relay_host() {
    let config = ChannelConfig::Email(crate::channels::EmailConfig {
        smtp_host: "smtp.example.com".into(),
        smtp_port: 587,
        smtp_username: Some("vigil".into()),
        smtp_password: Some("secret".into()),
        from: "vigil@example.com".into(),
        recipients: vec!["ops@example.com".into()],
    });
    assert_eq!(Channel::build(&config).unwrap().kind(), "email");
}

#[test]
fn chat_config_builds() {
    let config = ChannelConfig::Chat(crate::channels::ChatConfig {
        webhook_url: "https://hooks.slack.example/services/T0/B0/x".into(),
    });
    assert_eq!(Channel::build(&config).unwrap().kind(), "chat");
}

// ── Payload formatting ──

#[test]
fn webhook_payload_carries_full_alert_record() {
    let mut alert = make_alert("cpu_high", Severity::Critical);
    alert.labels.insert("host".into(), "web-01".into());

    let payload = WebhookChannel::payload(&alert);
    assert_eq!(payload["source"], "vigil");
    assert_eq!(payload["alert"]["rule_name"], "cpu_high");
    assert_eq!(payload["alert"]["severity"], "critical");
    assert_eq!(payload["alert"]["status"], "active");
    assert_eq!(payload["alert"]["value"], 95.0);
    assert_eq!(payload["alert"]["labels"]["host"], "web-01");
}

#[test]
fn chat_payload_colors_by_severity() {
    let critical = ChatWebhookChannel::payload(&make_alert("cpu_high", Severity::Critical));
    assert_eq!(critical["attachments"][0]["color"], "danger");

    let warning = ChatWebhookChannel::payload(&make_alert("cpu_high", Severity::Warning));
    assert_eq!(warning["attachments"][0]["color"], "warning");

    let info = ChatWebhookChannel::payload(&make_alert("cpu_high", Severity::Info));
    assert_eq!(info["attachments"][0]["color"], "good");
}

// ── Dispatcher ──

#[tokio::test]
async fn dispatch_isolates_channel_failures() {
    let mut dispatcher = NotificationDispatcher::new(2);
    dispatcher.add_channel("hook-a", failing_webhook(), Severity::Info, true);
    dispatcher.add_channel("hook-b", failing_webhook(), Severity::Info, true);

    // Both channels fail; dispatch still completes and counts each failure.
    dispatcher.dispatch(&make_alert("cpu_high", Severity::Critical)).await;
    assert_eq!(dispatcher.failures_total(), 2);
    assert_eq!(dispatcher.dispatched_total(), 0);
}

#[tokio::test]
async fn disabled_channels_are_skipped() {
    let mut dispatcher = NotificationDispatcher::new(2);
    dispatcher.add_channel("hook-a", failing_webhook(), Severity::Info, false);

    dispatcher.dispatch(&make_alert("cpu_high", Severity::Critical)).await;
    assert_eq!(dispatcher.failures_total(), 0);

    assert!(dispatcher.enable_channel("hook-a"));
    dispatcher.dispatch(&make_alert("cpu_high", Severity::Critical)).await;
    assert_eq!(dispatcher.failures_total(), 1);
}

#[tokio::test]
async fn severity_routing_filters_low_severity_alerts() {
    let mut dispatcher = NotificationDispatcher::new(2);
    dispatcher.add_channel("critical-only", failing_webhook(), Severity::Critical, true);

    dispatcher.dispatch(&make_alert("noise", Severity::Warning)).await;
    assert_eq!(dispatcher.failures_total(), 0, "warning alert must not reach the channel");

    dispatcher.dispatch(&make_alert("fire", Severity::Critical)).await;
    assert_eq!(dispatcher.failures_total(), 1);
}

#[test]
fn toggling_unknown_channel_reports_not_found() {
    let dispatcher = NotificationDispatcher::default();
    assert!(!dispatcher.enable_channel("nope"));
    assert!(!dispatcher.disable_channel("nope"));
    assert_eq!(dispatcher.is_enabled("nope"), None);
}
