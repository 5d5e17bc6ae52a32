use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vigil_common::types::{Alert, Severity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Incoming-webhook URL of a Slack-compatible chat service.
    pub webhook_url: String,
}

/// Chat notifications via a Slack-compatible incoming webhook, rendered as
/// an attachment colored by severity.
pub struct ChatWebhookChannel {
    client: reqwest::Client,
    webhook_url: String,
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "danger",
        Severity::Warning => "warning",
        Severity::Info => "good",
    }
}

impl ChatWebhookChannel {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.webhook_url.clone(),
        }
    }

    pub fn payload(alert: &Alert) -> Value {
        serde_json::json!({
            "text": format!("Alert: {}", alert.rule_name),
            "attachments": [{
                "color": severity_color(alert.severity),
                "fields": [
                    { "title": "Rule", "value": alert.rule_name, "short": true },
                    { "title": "Severity", "value": alert.severity.to_string(), "short": true },
                    { "title": "Value", "value": format!("{:.2}", alert.value), "short": true },
                    { "title": "Status", "value": alert.status.to_string(), "short": true },
                    { "title": "Message", "value": alert.message, "short": false },
                    { "title": "Time", "value": alert.created_at.format("%Y-%m-%d %H:%M:%S").to_string(), "short": false },
                ],
            }],
        })
    }

    pub async fn send(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&Self::payload(alert))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                service: "chat".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(rule = %alert.rule_name, "Chat notification sent");
        Ok(())
    }
}
