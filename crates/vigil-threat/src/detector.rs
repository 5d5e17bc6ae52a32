use crate::window::SlidingWindowTracker;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use vigil_common::types::{SecurityEvent, SecurityEventKind, ThreatKind, ThreatSignal};

/// Detection windows and thresholds for the three tracked patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatConfig {
    /// Brute-force: failed logins per source IP.
    #[serde(default = "default_login_failure_window_secs")]
    pub login_failure_window_secs: u64,
    #[serde(default = "default_login_failure_threshold")]
    pub login_failure_threshold: usize,

    /// Rate abuse: API calls per user id or IP.
    #[serde(default = "default_api_call_window_secs")]
    pub api_call_window_secs: u64,
    #[serde(default = "default_api_call_threshold")]
    pub api_call_threshold: usize,

    /// Suspicious access: data accesses per user id.
    #[serde(default = "default_data_access_window_secs")]
    pub data_access_window_secs: u64,
    #[serde(default = "default_data_access_threshold")]
    pub data_access_threshold: usize,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            login_failure_window_secs: default_login_failure_window_secs(),
            login_failure_threshold: default_login_failure_threshold(),
            api_call_window_secs: default_api_call_window_secs(),
            api_call_threshold: default_api_call_threshold(),
            data_access_window_secs: default_data_access_window_secs(),
            data_access_threshold: default_data_access_threshold(),
        }
    }
}

fn default_login_failure_window_secs() -> u64 {
    300
}

fn default_login_failure_threshold() -> usize {
    5
}

fn default_api_call_window_secs() -> u64 {
    60
}

fn default_api_call_threshold() -> usize {
    100
}

fn default_data_access_window_secs() -> u64 {
    3600
}

fn default_data_access_threshold() -> usize {
    20
}

/// Edge-triggered detection outcome.
#[derive(Debug, Clone)]
pub enum ThreatOutcome {
    /// An identifier's window just reached its threshold.
    Raised(ThreatSignal),
    /// A previously flagged identifier dropped back below its threshold.
    Cleared { kind: ThreatKind, identifier: String },
}

struct Pattern {
    kind: ThreatKind,
    tracker: SlidingWindowTracker,
    threshold: usize,
    /// Identifiers currently at or above threshold. Crossings are reported
    /// once on the way up and once on the way down.
    flagged: Mutex<HashSet<String>>,
}

impl Pattern {
    fn new(kind: ThreatKind, window_secs: u64, threshold: usize) -> Self {
        Self {
            kind,
            tracker: SlidingWindowTracker::new(window_secs),
            threshold: threshold.max(1),
            flagged: Mutex::new(HashSet::new()),
        }
    }

    fn observe(&self, identifier: &str, now: DateTime<Utc>) -> Option<ThreatOutcome> {
        let count = self.tracker.record(identifier, now);
        let mut flagged = self.flagged.lock().unwrap();
        if count >= self.threshold {
            if flagged.insert(identifier.to_string()) {
                tracing::warn!(
                    kind = %self.kind,
                    identifier,
                    count,
                    window_secs = self.tracker.window_secs(),
                    "Threat threshold crossed"
                );
                return Some(ThreatOutcome::Raised(ThreatSignal {
                    kind: self.kind,
                    identifier: identifier.to_string(),
                    evidence_count: count,
                    window_secs: self.tracker.window_secs(),
                }));
            }
        } else if flagged.remove(identifier) {
            tracing::info!(kind = %self.kind, identifier, count, "Threat subsided");
            return Some(ThreatOutcome::Cleared {
                kind: self.kind,
                identifier: identifier.to_string(),
            });
        }
        None
    }

    fn sweep(&self, now: DateTime<Utc>, outcomes: &mut Vec<ThreatOutcome>) {
        self.tracker.sweep(now);
        let mut flagged = self.flagged.lock().unwrap();
        flagged.retain(|identifier| {
            if self.tracker.count(identifier, now) < self.threshold {
                tracing::info!(kind = %self.kind, identifier = %identifier, "Threat window decayed");
                outcomes.push(ThreatOutcome::Cleared {
                    kind: self.kind,
                    identifier: identifier.clone(),
                });
                false
            } else {
                true
            }
        });
    }
}

/// Consumes raw security events and flags brute-force, rate-abuse, and
/// suspicious data-access patterns.
///
/// Safe to call concurrently from many request-handling contexts; the
/// underlying trackers shard their locks by identifier.
pub struct ThreatDetector {
    login_failures: Pattern,
    api_calls: Pattern,
    data_access: Pattern,
}

impl Default for ThreatDetector {
    fn default() -> Self {
        Self::new(&ThreatConfig::default())
    }
}

impl ThreatDetector {
    pub fn new(config: &ThreatConfig) -> Self {
        Self {
            login_failures: Pattern::new(
                ThreatKind::BruteForce,
                config.login_failure_window_secs,
                config.login_failure_threshold,
            ),
            api_calls: Pattern::new(
                ThreatKind::RateLimit,
                config.api_call_window_secs,
                config.api_call_threshold,
            ),
            data_access: Pattern::new(
                ThreatKind::SuspiciousAccess,
                config.data_access_window_secs,
                config.data_access_threshold,
            ),
        }
    }

    /// Feed one security event through its pattern tracker.
    ///
    /// Returns a raise/clear outcome on threshold transitions. Events with
    /// blank identifiers are logged and dropped; detection never fails into
    /// the caller's request path.
    pub fn observe(&self, event: &SecurityEvent, now: DateTime<Utc>) -> Option<ThreatOutcome> {
        let identifier = event.identifier.trim();
        if identifier.is_empty() {
            tracing::warn!(kind = %event.kind, "Dropping security event with empty identifier");
            return None;
        }

        match event.kind {
            SecurityEventKind::LoginFailure => self.login_failures.observe(identifier, now),
            SecurityEventKind::ApiCall => self.api_calls.observe(identifier, now),
            SecurityEventKind::DataAccess => self.data_access.observe(identifier, now),
            SecurityEventKind::LoginSuccess => {
                // Recorded by callers for audit purposes; carries no threat
                // signal on its own.
                tracing::trace!(identifier, "Login success observed");
                None
            }
        }
    }

    /// Prune all windows, evict empty identifiers, and clear flags whose
    /// windows decayed below threshold purely by time passing.
    ///
    /// Driven from the periodic evaluation tick.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<ThreatOutcome> {
        let mut outcomes = Vec::new();
        self.login_failures.sweep(now, &mut outcomes);
        self.api_calls.sweep(now, &mut outcomes);
        self.data_access.sweep(now, &mut outcomes);
        outcomes
    }

    /// Total identifiers currently tracked across all patterns.
    pub fn tracked_identifiers(&self) -> usize {
        self.login_failures.tracker.identifier_count()
            + self.api_calls.tracker.identifier_count()
            + self.data_access.tracker.identifier_count()
    }
}
