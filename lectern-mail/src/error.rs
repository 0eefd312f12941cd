//! Mail error types.

use std::time::Duration;
use thiserror::Error;

/// Result type for mail operations.
pub type Result<T> = std::result::Result<T, MailError>;

/// Mail errors.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP connection or protocol error.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Attachment error.
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider rejected the request.
    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    /// Rate limited.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error.
    #[error("Operation timed out")]
    Timeout,
}

impl MailError {
    /// Whether a later attempt could plausibly succeed.
    ///
    /// The job queue retries every failure regardless; this is for callers
    /// sending directly.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Smtp(_) | Self::Network(_) | Self::Timeout | Self::RateLimited(_) => true,
            Self::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get retry-after duration if rate limited.
    pub fn retry_after(&self) -> Option<Duration> {
        if let Self::RateLimited(secs) = self {
            Some(Duration::from_secs(*secs))
        } else {
            None
        }
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Smtp(err.to_string())
        }
    }
}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        Self::InvalidAddress(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
