use serde::{Deserialize, Serialize};
use vigil_alert::engine::AlertRule;
use vigil_common::types::Severity;
use vigil_notify::ChannelConfig;
use vigil_threat::ThreatConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between metric-evaluation cycles.
    #[serde(default = "default_evaluation_interval_secs")]
    pub evaluation_interval_secs: u64,

    /// Capacity of the alert history ring buffer.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Seconds before an in-flight notification send is abandoned.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Capacity of the queue between evaluation and the dispatch worker.
    #[serde(default = "default_dispatch_queue_capacity")]
    pub dispatch_queue_capacity: usize,

    /// Seconds shutdown waits for in-flight work before aborting it.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub threat: ThreatConfig,

    /// Notification channels. All disabled-by-default unless a channel says
    /// otherwise; an empty list runs the core without notifications.
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,

    /// Alert rules. When empty, the built-in default rule set is seeded.
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub name: String,
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,
    #[serde(default = "default_channel_enabled")]
    pub enabled: bool,
    #[serde(flatten)]
    pub channel: ChannelConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_secs: default_evaluation_interval_secs(),
            history_capacity: default_history_capacity(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            dispatch_queue_capacity: default_dispatch_queue_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            threat: ThreatConfig::default(),
            channels: Vec::new(),
            rules: Vec::new(),
        }
    }
}

fn default_evaluation_interval_secs() -> u64 {
    30
}

fn default_history_capacity() -> usize {
    1000
}

fn default_dispatch_timeout_secs() -> u64 {
    10
}

fn default_dispatch_queue_capacity() -> usize {
    256
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

fn default_min_severity() -> Severity {
    Severity::Info
}

fn default_channel_enabled() -> bool {
    true
}

impl MonitorConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}
