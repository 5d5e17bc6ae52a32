use crate::channels::Channel;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use vigil_common::types::{Alert, Severity};

/// Default seconds before an in-flight channel send is abandoned.
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 10;

/// One registered channel with its routing and enablement state.
pub struct ChannelEntry {
    name: String,
    channel: Channel,
    /// Alerts below this severity are not routed to the channel.
    min_severity: Severity,
    enabled: AtomicBool,
}

impl ChannelEntry {
    fn should_send(&self, severity: Severity) -> bool {
        self.enabled.load(Ordering::Relaxed) && severity >= self.min_severity
    }
}

/// Fans alerts out to every enabled channel concurrently.
///
/// Delivery is best-effort and at-most-once per dispatch call: a failed or
/// timed-out channel is logged and counted, other channels are unaffected,
/// and the alert state transition that triggered the dispatch is never
/// rolled back. Channels needing durability must keep their own outbound
/// queue.
pub struct NotificationDispatcher {
    channels: Vec<Arc<ChannelEntry>>,
    send_timeout: Duration,
    dispatched: AtomicU64,
    failures: AtomicU64,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SEND_TIMEOUT_SECS)
    }
}

impl NotificationDispatcher {
    pub fn new(send_timeout_secs: u64) -> Self {
        Self {
            channels: Vec::new(),
            send_timeout: Duration::from_secs(send_timeout_secs.max(1)),
            dispatched: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    /// Register a channel. Called during construction, before the dispatcher
    /// is shared.
    pub fn add_channel(
        &mut self,
        name: &str,
        channel: Channel,
        min_severity: Severity,
        enabled: bool,
    ) {
        tracing::info!(
            channel = name,
            kind = channel.kind(),
            min_severity = %min_severity,
            enabled,
            "Notification channel registered"
        );
        self.channels.push(Arc::new(ChannelEntry {
            name: name.to_string(),
            channel,
            min_severity,
            enabled: AtomicBool::new(enabled),
        }));
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.channels.iter().find(|c| c.name == name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Relaxed);
                tracing::info!(channel = name, enabled, "Notification channel toggled");
                true
            }
            None => false,
        }
    }

    /// Enable a channel by name. Returns false if no such channel exists.
    pub fn enable_channel(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a channel by name. Returns false if no such channel exists.
    pub fn disable_channel(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    pub fn is_enabled(&self, name: &str) -> Option<bool> {
        self.channels
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.enabled.load(Ordering::Relaxed))
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.name.clone()).collect()
    }

    /// Send `alert` to every enabled channel whose severity gate passes.
    ///
    /// Channels run concurrently; each send is bounded by the per-channel
    /// timeout. Returns once every channel has finished or been abandoned.
    pub async fn dispatch(&self, alert: &Alert) {
        let mut tasks = JoinSet::new();

        for entry in &self.channels {
            if !entry.should_send(alert.severity) {
                continue;
            }
            let entry = Arc::clone(entry);
            let alert = alert.clone();
            let timeout = self.send_timeout;
            tasks.spawn(async move {
                let result = tokio::time::timeout(timeout, entry.channel.send(&alert)).await;
                (entry, alert, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let Ok((entry, alert, result)) = joined else {
                continue;
            };
            match result {
                Ok(Ok(())) => {
                    self.dispatched.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        channel = %entry.name,
                        alert_id = %alert.id,
                        error = %e,
                        "Notification send failed"
                    );
                }
                Err(_) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        channel = %entry.name,
                        alert_id = %alert.id,
                        timeout_secs = self.send_timeout.as_secs(),
                        "Notification send timed out"
                    );
                }
            }
        }
    }

    /// Total successful channel sends.
    pub fn dispatched_total(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Total failed or timed-out channel sends.
    pub fn failures_total(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}
