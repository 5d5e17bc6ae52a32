//! In-memory metric registry: named counter/gauge/histogram definitions and
//! their current values.
//!
//! The registry is a pure data store. It keeps no history; temporal logic
//! (breach durations, sliding windows) lives in the rule engine and threat
//! detector. Ingestion never fails: writes to unknown metrics are logged
//! no-ops and never crash the ingestion path.

pub mod registry;

#[cfg(test)]
mod tests;

pub use registry::{MetricDef, MetricKind, MetricRegistry};

/// Errors from metric registration.
#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    /// A metric with this name is already registered.
    #[error("metric already registered: {0}")]
    DuplicateMetric(String),
}

/// Convenience `Result` alias for registry operations.
pub type Result<T> = std::result::Result<T, MetricError>;
