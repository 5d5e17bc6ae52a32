use crate::error::{NotifyError, Result};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use vigil_common::types::{format_labels, Alert, AlertStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    pub from: String,
    pub recipients: Vec<String>,
}

/// SMTP delivery of alert notifications as plain-text email.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| NotifyError::InvalidConfig(format!("smtp relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
            recipients: config.recipients.clone(),
        })
    }

    fn subject(alert: &Alert) -> String {
        let status_tag = match alert.status {
            AlertStatus::Resolved => " [RESOLVED]",
            AlertStatus::Silenced => " [SILENCED]",
            AlertStatus::Active => "",
        };
        format!(
            "[vigil][{}]{} {}",
            alert.severity, status_tag, alert.rule_name
        )
    }

    fn format_body(alert: &Alert) -> String {
        let labels_str = format_labels(&alert.labels);
        let labels_line = if labels_str.is_empty() {
            String::new()
        } else {
            format!("\nLabels: {labels_str}")
        };
        let annotations_str = format_labels(&alert.annotations);
        let annotations_line = if annotations_str.is_empty() {
            String::new()
        } else {
            format!("\nAnnotations: {annotations_str}")
        };
        format!(
            "Alert: {severity}\nRule: {rule}\nStatus: {status}{labels_line}{annotations_line}\nValue: {value:.2}\nMessage: {message}\nTime: {time}",
            severity = alert.severity,
            rule = alert.rule_name,
            status = alert.status,
            labels_line = labels_line,
            annotations_line = annotations_line,
            value = alert.value,
            message = alert.message,
            time = alert.created_at,
        )
    }

    pub async fn send(&self, alert: &Alert) -> Result<()> {
        let subject = Self::subject(alert);
        let body = Self::format_body(alert);

        for recipient in &self.recipients {
            let email = Message::builder()
                .from(
                    self.from
                        .parse()
                        .map_err(|e| NotifyError::Address(format!("{}: {e}", self.from)))?,
                )
                .to(recipient
                    .parse()
                    .map_err(|e| NotifyError::Address(format!("{recipient}: {e}")))?)
                .subject(&subject)
                .header(ContentType::TEXT_PLAIN)
                .body(body.clone())
                .map_err(|e| NotifyError::Smtp(e.to_string()))?;

            self.transport
                .send(email)
                .await
                .map_err(|e| NotifyError::Smtp(e.to_string()))?;
            tracing::info!(recipient = %recipient, rule = %alert.rule_name, "Email notification sent");
        }

        Ok(())
    }
}
