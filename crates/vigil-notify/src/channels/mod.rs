pub mod chat;
pub mod email;
pub mod webhook;

use crate::error::Result;
use serde::{Deserialize, Serialize};
use vigil_common::types::Alert;

pub use chat::{ChatConfig, ChatWebhookChannel};
pub use email::{EmailChannel, EmailConfig};
pub use webhook::{WebhookChannel, WebhookConfig};

/// Configuration for one notification channel, tagged by kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    Email(EmailConfig),
    Webhook(WebhookConfig),
    Chat(ChatConfig),
}

/// A configured notification channel.
///
/// The channel set is a closed enum rather than a trait object: every kind
/// is dispatched through the single `match` in [`Channel::send`], so adding
/// a kind is a compile-checked change everywhere a channel is handled.
pub enum Channel {
    Email(EmailChannel),
    Webhook(WebhookChannel),
    Chat(ChatWebhookChannel),
}

impl Channel {
    /// Construct the channel transport from its configuration.
    pub fn build(config: &ChannelConfig) -> Result<Self> {
        match config {
            ChannelConfig::Email(cfg) => Ok(Channel::Email(EmailChannel::new(cfg)?)),
            ChannelConfig::Webhook(cfg) => Ok(Channel::Webhook(WebhookChannel::new(cfg))),
            ChannelConfig::Chat(cfg) => Ok(Channel::Chat(ChatWebhookChannel::new(cfg))),
        }
    }

    /// Deliver `alert` through this channel.
    pub async fn send(&self, alert: &Alert) -> Result<()> {
        match self {
            Channel::Email(ch) => ch.send(alert).await,
            Channel::Webhook(ch) => ch.send(alert).await,
            Channel::Chat(ch) => ch.send(alert).await,
        }
    }

    /// Channel kind name for logging (e.g. `"email"`).
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Email(_) => "email",
            Channel::Webhook(_) => "webhook",
            Channel::Chat(_) => "chat",
        }
    }
}
