//! Notification delivery for alert lifecycle events.
//!
//! Alerts fan out to a closed set of channel kinds (email over SMTP, generic
//! JSON webhook, chat webhook) through a single
//! [`channels::Channel::send`] dispatch. The [`dispatcher`] runs all enabled
//! channels concurrently with a per-channel timeout; one channel's failure
//! never affects the others, and never rolls back the alert transition that
//! triggered the dispatch.

pub mod channels;
pub mod dispatcher;
pub mod error;

#[cfg(test)]
mod tests;

pub use channels::{Channel, ChannelConfig};
pub use dispatcher::NotificationDispatcher;
pub use error::NotifyError;
