use crate::AlertError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vigil_common::types::{format_labels, MetricSample, Severity};

/// Tolerance for equality comparisons on floating point samples.
const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">", alias = "gt", alias = "greater_than")]
    GreaterThan,
    #[serde(rename = "<", alias = "lt", alias = "less_than")]
    LessThan,
    #[serde(rename = ">=", alias = "gte", alias = "greater_equal")]
    GreaterEqual,
    #[serde(rename = "<=", alias = "lte", alias = "less_equal")]
    LessEqual,
    #[serde(rename = "==", alias = "eq", alias = "equal")]
    Equal,
    #[serde(rename = "!=", alias = "ne", alias = "not_equal")]
    NotEqual,
}

impl std::str::FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "gt" | "greater_than" => Ok(Self::GreaterThan),
            "<" | "lt" | "less_than" => Ok(Self::LessThan),
            ">=" | "gte" | "greater_equal" => Ok(Self::GreaterEqual),
            "<=" | "lte" | "less_equal" => Ok(Self::LessEqual),
            "==" | "eq" | "equal" => Ok(Self::Equal),
            "!=" | "ne" | "not_equal" => Ok(Self::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, ">"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterEqual => write!(f, ">="),
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
        }
    }
}

impl CompareOp {
    fn check(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::GreaterThan => value > threshold,
            Self::LessThan => value < threshold,
            Self::GreaterEqual => value >= threshold,
            Self::LessEqual => value <= threshold,
            Self::Equal => (value - threshold).abs() < EPSILON,
            Self::NotEqual => (value - threshold).abs() >= EPSILON,
        }
    }
}

fn op_str(op: CompareOp) -> &'static str {
    match op {
        CompareOp::GreaterThan => "above",
        CompareOp::LessThan => "below",
        CompareOp::GreaterEqual => "at or above",
        CompareOp::LessEqual => "at or below",
        CompareOp::Equal => "equal to",
        CompareOp::NotEqual => "different from",
    }
}

fn default_enabled() -> bool {
    true
}

/// A threshold rule evaluated against metric samples.
///
/// Immutable once registered except for `enabled` and `threshold`/
/// `condition` edits through the engine's explicit setters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule name, used as the alert dedup key.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The metric name this rule applies to (e.g. `"system_cpu_usage"`).
    pub metric: String,
    pub condition: CompareOp,
    pub threshold: f64,
    pub severity: Severity,
    /// Seconds a breach must hold before the rule triggers an alert.
    #[serde(default)]
    pub min_breach_secs: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

/// Per-rule breach tracking. Reset to empty the instant the rule stops
/// breaching, so breach durations never carry over across gaps.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BreachState {
    pub first_breach_at: Option<DateTime<Utc>>,
    pub last_breach_at: Option<DateTime<Utc>>,
    pub breach_count: u64,
    pub consecutive_breaches: u64,
}

/// Everything the lifecycle manager needs to create an alert.
#[derive(Debug, Clone)]
pub struct AlertTrigger {
    pub rule_name: String,
    pub message: String,
    pub severity: Severity,
    pub value: f64,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

/// Outcome of evaluating one sample against one rule.
#[derive(Debug, Clone)]
pub enum RuleEvent {
    /// The rule has been breaching for at least its minimum breach duration.
    /// Emitted on every such cycle; the lifecycle manager's dedup-by-rule-name
    /// makes triggering idempotent.
    Triggered(AlertTrigger),
    /// The rule transitioned from breaching to clear.
    Cleared { rule_name: String },
}

/// Read-only view of one rule for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct RuleStatus {
    pub enabled: bool,
    pub severity: Severity,
    pub threshold: f64,
    pub state: BreachState,
}

/// Holds the rule set and per-rule breach state.
///
/// The engine is driven from a single periodic evaluation task, so it has no
/// interior locking; the caller wraps it in a mutex when sharing.
#[derive(Default)]
pub struct RuleEngine {
    rules: HashMap<String, AlertRule>,
    states: HashMap<String, BreachState>,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule with fresh breach state. Fails if the name is taken.
    pub fn add_rule(&mut self, rule: AlertRule) -> crate::Result<()> {
        if self.rules.contains_key(&rule.name) {
            return Err(AlertError::DuplicateRule(rule.name));
        }
        tracing::info!(rule = %rule.name, metric = %rule.metric, "Alert rule added");
        self.states.insert(rule.name.clone(), BreachState::default());
        self.rules.insert(rule.name.clone(), rule);
        Ok(())
    }

    /// Remove a rule and its breach state. Returns the removed rule so the
    /// caller can force-resolve any alert still active for it.
    pub fn remove_rule(&mut self, name: &str) -> Option<AlertRule> {
        self.states.remove(name);
        let removed = self.rules.remove(name);
        if removed.is_some() {
            tracing::info!(rule = name, "Alert rule removed");
        }
        removed
    }

    pub fn get_rule(&self, name: &str) -> Option<&AlertRule> {
        self.rules.get(name)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> crate::Result<()> {
        let rule = self
            .rules
            .get_mut(name)
            .ok_or_else(|| AlertError::UnknownRule(name.to_string()))?;
        rule.enabled = enabled;
        Ok(())
    }

    /// Change a rule's threshold. The rule's breach state is reset so a
    /// stale breach timer can never fire against the edited rule.
    pub fn set_threshold(&mut self, name: &str, threshold: f64) -> crate::Result<()> {
        let rule = self
            .rules
            .get_mut(name)
            .ok_or_else(|| AlertError::UnknownRule(name.to_string()))?;
        rule.threshold = threshold;
        self.states.insert(name.to_string(), BreachState::default());
        Ok(())
    }

    /// Change a rule's condition, resetting its breach state.
    pub fn set_condition(&mut self, name: &str, condition: CompareOp) -> crate::Result<()> {
        let rule = self
            .rules
            .get_mut(name)
            .ok_or_else(|| AlertError::UnknownRule(name.to_string()))?;
        rule.condition = condition;
        self.states.insert(name.to_string(), BreachState::default());
        Ok(())
    }

    /// Evaluate one sample against every enabled rule watching its metric.
    ///
    /// Non-finite values are logged per-rule and treated as not breached for
    /// this cycle, so one bad sample never blocks the other rules.
    pub fn evaluate(&mut self, sample: &MetricSample, now: DateTime<Utc>) -> Vec<RuleEvent> {
        let mut events = Vec::new();

        for rule in self.rules.values() {
            if !rule.enabled || rule.metric != sample.name {
                continue;
            }

            let breached = if sample.value.is_finite() {
                rule.condition.check(sample.value, rule.threshold)
            } else {
                tracing::error!(
                    rule = %rule.name,
                    metric = %sample.name,
                    value = sample.value,
                    "Non-finite sample value, treating as not breached"
                );
                false
            };

            let state = self.states.entry(rule.name.clone()).or_default();

            if breached {
                let first = *state.first_breach_at.get_or_insert(now);
                state.last_breach_at = Some(now);
                state.breach_count += 1;
                state.consecutive_breaches += 1;

                if now - first >= Duration::seconds(rule.min_breach_secs as i64) {
                    events.push(RuleEvent::Triggered(make_trigger(rule, sample)));
                }
            } else if state.first_breach_at.is_some() {
                state.first_breach_at = None;
                state.consecutive_breaches = 0;
                events.push(RuleEvent::Cleared {
                    rule_name: rule.name.clone(),
                });
            }
        }

        events
    }

    /// Snapshot of every rule's configuration and breach state.
    pub fn rule_status(&self) -> HashMap<String, RuleStatus> {
        self.rules
            .iter()
            .map(|(name, rule)| {
                (
                    name.clone(),
                    RuleStatus {
                        enabled: rule.enabled,
                        severity: rule.severity,
                        threshold: rule.threshold,
                        state: self.states.get(name).cloned().unwrap_or_default(),
                    },
                )
            })
            .collect()
    }
}

fn make_trigger(rule: &AlertRule, sample: &MetricSample) -> AlertTrigger {
    let labels_str = format_labels(&sample.labels);
    let labels_display = if labels_str.is_empty() {
        String::new()
    } else {
        format!(" [{labels_str}]")
    };
    let subject = if rule.description.is_empty() {
        rule.name.clone()
    } else {
        rule.description.clone()
    };
    AlertTrigger {
        rule_name: rule.name.clone(),
        message: format!(
            "{}: {}{} has been {} {:.1} (current value {:.2})",
            subject,
            rule.metric,
            labels_display,
            op_str(rule.condition),
            rule.threshold,
            sample.value,
        ),
        severity: rule.severity,
        value: sample.value,
        labels: rule.labels.clone(),
        annotations: rule.annotations.clone(),
    }
}
