/// Errors that can occur within the notification subsystem.
///
/// # Examples
///
/// ```rust
/// use vigil_notify::error::NotifyError;
///
/// let err = NotifyError::InvalidConfig("missing smtp_host".to_string());
/// assert!(err.to_string().contains("smtp_host"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Channel configuration is missing a required field or contains an
    /// invalid value.
    #[error("notify: invalid channel configuration: {0}")]
    InvalidConfig(String),

    /// An HTTP request to an external notification endpoint failed.
    #[error("notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// SMTP transport error when sending email.
    #[error("notify: SMTP error: {0}")]
    Smtp(String),

    /// A sender or recipient address failed to parse.
    #[error("notify: invalid address: {0}")]
    Address(String),

    /// JSON serialization of a notification payload failed.
    #[error("notify: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external API returned a non-success response.
    #[error("notify: API error from {service}: status={status}, body={body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
