//! Sliding-window threat detection over raw security events.
//!
//! [`window::SlidingWindowTracker`] counts recent event timestamps per
//! identifier (an IP, a user id) over a trailing interval.
//! [`detector::ThreatDetector`] feeds login-failure, API-call, and
//! data-access events through three trackers and turns threshold crossings
//! into edge-triggered raise/clear outcomes for the alert lifecycle.
//!
//! Detection is called inline from request-handling paths, so it fails
//! open: malformed events are logged and dropped, and nothing here panics
//! into the caller.

pub mod detector;
pub mod window;


pub use detector::{ThreatConfig, ThreatDetector, ThreatOutcome};
pub use window::SlidingWindowTracker;
