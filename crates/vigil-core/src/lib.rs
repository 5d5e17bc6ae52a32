//! Composition root for the vigil monitoring core.
//!
//! [`monitor::Monitor`] wires the metric registry, rule engine, alert
//! lifecycle manager, notification dispatcher, and threat detector into one
//! explicit context object, constructed once at process start and passed by
//! handle to collaborators. It runs the periodic metric-evaluation task and
//! the async notification worker, and owns graceful shutdown of both.

pub mod config;
pub mod monitor;
pub mod seed;

pub use config::{ChannelSpec, MonitorConfig};
pub use monitor::Monitor;
