//! Configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    /// A source could not be read.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// A source was read but is not valid TOML, JSON or `.env`.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A value deserialized fine but breaks a rule.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error for '{key}': {message}")]
    DeserializationError { key: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),
}

impl ConfigError {
    pub(crate) fn deserialize(key: &str, err: serde_json::Error) -> Self {
        ConfigError::DeserializationError {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
