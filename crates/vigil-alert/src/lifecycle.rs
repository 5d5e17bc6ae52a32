use crate::engine::AlertTrigger;
use crate::AlertError;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use vigil_common::types::{Alert, AlertStatus};

/// Default number of history records kept in the ring buffer.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

struct Inner {
    /// Active and silenced alerts, keyed by rule name. The key is the dedup
    /// guarantee: at most one live alert per rule name.
    active: HashMap<String, Alert>,
    history: VecDeque<Alert>,
}

/// Owns the active-alerts map and the bounded alert history.
///
/// State machine per rule name: `none -> active -> resolved`, with
/// `active <-> silenced` in between. The manager locks internally so it can
/// be shared between the periodic evaluation task and the inline threat
/// path.
pub struct AlertLifecycleManager {
    inner: Mutex<Inner>,
    history_capacity: usize,
}

impl Default for AlertLifecycleManager {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl AlertLifecycleManager {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                active: HashMap::new(),
                history: VecDeque::new(),
            }),
            history_capacity: history_capacity.max(1),
        }
    }

    fn push_history(&self, inner: &mut Inner, alert: Alert) {
        if inner.history.len() == self.history_capacity {
            inner.history.pop_front();
        }
        inner.history.push_back(alert);
    }

    /// Create a new active alert for `trigger.rule_name`.
    ///
    /// Fails with [`AlertError::AlreadyActive`] when an active or silenced
    /// alert already exists for that rule; callers treat this as an
    /// idempotent no-op, so feeding sustained breaches produces exactly one
    /// alert. On success the created alert is returned for dispatch.
    pub fn trigger(&self, trigger: AlertTrigger, now: DateTime<Utc>) -> crate::Result<Alert> {
        let mut inner = self.inner.lock().unwrap();
        if inner.active.contains_key(&trigger.rule_name) {
            return Err(AlertError::AlreadyActive(trigger.rule_name));
        }

        let alert = Alert {
            id: vigil_common::id::next_id(),
            rule_name: trigger.rule_name.clone(),
            message: trigger.message,
            severity: trigger.severity,
            status: AlertStatus::Active,
            value: trigger.value,
            labels: trigger.labels,
            annotations: trigger.annotations,
            created_at: now,
            resolved_at: None,
            silenced_until: None,
        };

        tracing::warn!(
            rule = %alert.rule_name,
            severity = %alert.severity,
            message = %alert.message,
            "Alert triggered"
        );
        inner.active.insert(trigger.rule_name, alert.clone());
        self.push_history(&mut inner, alert.clone());
        Ok(alert)
    }

    /// Resolve the alert for `rule_name`, if one is live.
    ///
    /// Returns `None` when nothing is active (a no-op, per the lifecycle
    /// contract). Resolving a silenced alert drops its un-silence deadline,
    /// which cancels the pending revert. The terminal record is appended to
    /// history and returned for dispatch.
    pub fn resolve(&self, rule_name: &str, now: DateTime<Utc>) -> Option<Alert> {
        let mut inner = self.inner.lock().unwrap();
        let mut alert = inner.active.remove(rule_name)?;
        alert.status = AlertStatus::Resolved;
        alert.resolved_at = Some(now);
        alert.silenced_until = None;

        tracing::info!(rule = rule_name, "Alert resolved");
        self.push_history(&mut inner, alert.clone());
        Some(alert)
    }

    /// Silence the alert for `rule_name` for `duration_secs`.
    ///
    /// Fails with [`AlertError::NotActive`] when no live alert exists. The
    /// alert reverts to active once [`Self::expire_silences`] observes the
    /// deadline passing. Returns the deadline.
    pub fn silence(
        &self,
        rule_name: &str,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> crate::Result<DateTime<Utc>> {
        let mut inner = self.inner.lock().unwrap();
        let alert = inner
            .active
            .get_mut(rule_name)
            .ok_or_else(|| AlertError::NotActive(rule_name.to_string()))?;

        let until = now + Duration::seconds(duration_secs as i64);
        alert.status = AlertStatus::Silenced;
        alert.silenced_until = Some(until);
        tracing::info!(rule = rule_name, duration_secs, "Alert silenced");
        Ok(until)
    }

    /// Revert silenced alerts whose deadline has passed back to active.
    ///
    /// Called from the periodic evaluation tick so every time-based
    /// transition runs on the same clock. Returns the reverted rule names.
    pub fn expire_silences(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut inner = self.inner.lock().unwrap();
        let mut reverted = Vec::new();
        for alert in inner.active.values_mut() {
            if alert.status == AlertStatus::Silenced
                && alert.silenced_until.is_some_and(|until| until <= now)
            {
                alert.status = AlertStatus::Active;
                alert.silenced_until = None;
                reverted.push(alert.rule_name.clone());
            }
        }
        for rule in &reverted {
            tracing::info!(rule = %rule, "Silence expired, alert active again");
        }
        reverted
    }

    pub fn is_active(&self, rule_name: &str) -> bool {
        self.inner.lock().unwrap().active.contains_key(rule_name)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock().unwrap().active.len()
    }

    /// Snapshot of all live (active or silenced) alerts.
    pub fn list_active(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().active.values().cloned().collect()
    }

    /// The most recent `limit` history records, newest first.
    pub fn list_history(&self, limit: usize) -> Vec<Alert> {
        let inner = self.inner.lock().unwrap();
        inner.history.iter().rev().take(limit).cloned().collect()
    }
}
