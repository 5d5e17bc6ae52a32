use crate::error::{NotifyError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use vigil_common::types::Alert;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Extra request headers (e.g. an authorization token).
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// Generic JSON webhook: POSTs the full alert record to a configured URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
    headers: HashMap<String, String>,
}

impl WebhookChannel {
    pub fn new(config: &WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            headers: config.headers.clone(),
        }
    }

    pub fn payload(alert: &Alert) -> Value {
        serde_json::json!({
            "alert": {
                "id": alert.id,
                "rule_name": alert.rule_name,
                "message": alert.message,
                "severity": alert.severity.to_string(),
                "status": alert.status.to_string(),
                "value": alert.value,
                "labels": alert.labels,
                "annotations": alert.annotations,
                "created_at": alert.created_at.to_rfc3339(),
                "resolved_at": alert.resolved_at.map(|t| t.to_rfc3339()),
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "source": "vigil",
        })
    }

    pub async fn send(&self, alert: &Alert) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&Self::payload(alert));
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Api {
                service: "webhook".to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(url = %self.url, rule = %alert.rule_name, "Webhook notification sent");
        Ok(())
    }
}
