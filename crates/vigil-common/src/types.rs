use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single numeric observation pushed into the core by an external
/// collaborator. Samples are ephemeral: they are evaluated immediately and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSample {
    pub name: String,
    pub value: f64,
    pub labels: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use vigil_common::types::Severity;
///
/// let sev: Severity = "warning".parse().unwrap();
/// assert_eq!(sev, Severity::Warning);
/// assert_eq!(sev.to_string(), "warning");
/// assert!(Severity::Critical > Severity::Info);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// Lifecycle state of an alert. At most one Active or Silenced alert exists
/// per rule name at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Resolved,
    Silenced,
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertStatus::Active => write!(f, "active"),
            AlertStatus::Resolved => write!(f, "resolved"),
            AlertStatus::Silenced => write!(f, "silenced"),
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AlertStatus::Active),
            "resolved" => Ok(AlertStatus::Resolved),
            "silenced" => Ok(AlertStatus::Silenced),
            _ => Err(format!("unknown alert status: {s}")),
        }
    }
}

/// An alert instance. `rule_name` is the dedup key: the lifecycle manager
/// keeps its active set keyed by it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub rule_name: String,
    pub message: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub value: f64,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// Deadline after which a silenced alert reverts to active. Checked by
    /// the periodic evaluation tick, never by an OS timer.
    pub silenced_until: Option<DateTime<Utc>>,
}

/// Kind of a raw security event pushed inline from request-handling code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityEventKind {
    LoginFailure,
    LoginSuccess,
    ApiCall,
    DataAccess,
}

impl std::fmt::Display for SecurityEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityEventKind::LoginFailure => write!(f, "login_failure"),
            SecurityEventKind::LoginSuccess => write!(f, "login_success"),
            SecurityEventKind::ApiCall => write!(f, "api_call"),
            SecurityEventKind::DataAccess => write!(f, "data_access"),
        }
    }
}

/// A discrete security event. `identifier` is the tracking key: a source IP
/// for login failures, a user id or IP for API calls, a user id for data
/// accesses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub identifier: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Class of threat flagged by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    BruteForce,
    RateLimit,
    SuspiciousAccess,
}

impl ThreatKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatKind::BruteForce => "brute_force",
            ThreatKind::RateLimit => "rate_limit",
            ThreatKind::SuspiciousAccess => "suspicious_access",
        }
    }

    /// Synthetic rule name used to dedup threat alerts per identifier,
    /// e.g. `"threat:brute_force:10.0.0.9"`.
    pub fn rule_name(&self, identifier: &str) -> String {
        format!("threat:{}:{}", self.as_str(), identifier)
    }
}

impl std::fmt::Display for ThreatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold crossing observed by the threat detector. Consumed
/// immediately to synthesize an alert; never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatSignal {
    pub kind: ThreatKind,
    pub identifier: String,
    pub evidence_count: usize,
    pub window_secs: u64,
}

impl ThreatSignal {
    pub fn rule_name(&self) -> String {
        self.kind.rule_name(&self.identifier)
    }
}

/// Format a labels map into a human-readable string.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use vigil_common::types::format_labels;
///
/// let mut labels = HashMap::new();
/// labels.insert("endpoint".to_string(), "/api/reports".to_string());
/// labels.insert("method".to_string(), "GET".to_string());
/// let s = format_labels(&labels);
/// assert!(s.contains("endpoint=/api/reports"));
/// assert!(s.contains("method=GET"));
/// ```
pub fn format_labels(labels: &HashMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    let mut pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort();
    pairs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn alert_status_round_trip() {
        for s in ["active", "resolved", "silenced"] {
            let status: AlertStatus = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("gone".parse::<AlertStatus>().is_err());
    }

    #[test]
    fn threat_rule_name_is_unique_per_identifier() {
        let a = ThreatKind::BruteForce.rule_name("10.0.0.9");
        let b = ThreatKind::BruteForce.rule_name("10.0.0.10");
        assert_eq!(a, "threat:brute_force:10.0.0.9");
        assert_ne!(a, b);
    }

    #[test]
    fn format_labels_sorts_pairs() {
        let mut labels = HashMap::new();
        labels.insert("b".to_string(), "2".to_string());
        labels.insert("a".to_string(), "1".to_string());
        assert_eq!(format_labels(&labels), "a=1, b=2");
        assert_eq!(format_labels(&HashMap::new()), "");
    }
}
