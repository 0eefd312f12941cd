//! Error types for queue operations.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Error returned by a [`JobHandler`](crate::JobHandler) delivery attempt.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Queue-specific errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue was built outside of a Tokio runtime
    #[error("No Tokio runtime available to drive the queue")]
    NoRuntime,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown priority name
    #[error("Invalid priority: {0}")]
    InvalidPriority(String),
}
