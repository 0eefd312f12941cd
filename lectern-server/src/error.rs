//! Startup errors.

use thiserror::Error;

/// Anything that stops the service from starting.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] lectern_config::ConfigError),

    #[error("Mail setup failed: {0}")]
    Mail(#[from] lectern_mail::MailError),

    #[error("Queue setup failed: {0}")]
    Queue(#[from] lectern_queue::QueueError),

    #[error("Logging setup failed: {0}")]
    Log(#[from] lectern_log::LogError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_config::ConfigError;
    use lectern_log::LogError;
    use lectern_queue::QueueError;

    fn startup<E>(step: Result<(), E>) -> Result<(), ServerError>
    where
        ServerError: From<E>,
    {
        step?;
        Ok(())
    }

    #[test]
    fn test_startup_failures_keep_their_source() {
        let err = startup(Err(ConfigError::KeyNotFound("server.port".into()))).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
        assert_eq!(err.to_string(), "Configuration error: Configuration key not found: server.port");

        let err = startup(Err(QueueError::NoRuntime)).unwrap_err();
        assert!(matches!(err, ServerError::Queue(_)));
        assert!(err.to_string().starts_with("Queue setup failed: "));

        let err = startup(Err(LogError::InvalidLevel("loud".into()))).unwrap_err();
        assert!(matches!(err, ServerError::Log(_)));
        assert_eq!(err.to_string(), "Logging setup failed: Unknown log level: loud");

        let bind = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = startup(Err(bind)).unwrap_err();
        assert!(matches!(err, ServerError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: address in use");
    }
}
