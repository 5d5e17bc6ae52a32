//! Alert rule engine and alert lifecycle management.
//!
//! [`engine::RuleEngine`] evaluates incoming metric samples against
//! registered rules and tracks per-rule breach state, converting a sustained
//! breach into a trigger event once the rule's minimum breach duration has
//! elapsed. [`lifecycle::AlertLifecycleManager`] owns the active-alerts map
//! and history ring and moves alerts through
//! `active -> resolved` / `active <-> silenced`, deduplicating by rule name.

pub mod engine;
pub mod lifecycle;


/// Errors from rule registration and alert lifecycle transitions.
///
/// These are explicit result values, not control flow: callers are expected
/// to branch on them (e.g. [`AlertError::AlreadyActive`] marks an idempotent
/// trigger, not a failure).
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// A rule with this name is already registered.
    #[error("alert rule already exists: {0}")]
    DuplicateRule(String),

    /// No rule with this name is registered.
    #[error("unknown alert rule: {0}")]
    UnknownRule(String),

    /// An active or silenced alert already exists for this rule name.
    #[error("alert already active for rule: {0}")]
    AlreadyActive(String),

    /// No active alert exists for this rule name.
    #[error("no active alert for rule: {0}")]
    NotActive(String),
}

/// Convenience `Result` alias for alerting operations.
pub type Result<T> = std::result::Result<T, AlertError>;
