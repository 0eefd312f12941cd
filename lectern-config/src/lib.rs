//! Layered configuration for Lectern services.
//!
//! Values live in a single JSON tree addressed by dotted keys
//! (`queue.max_attempts`). Sources are applied in the order they are loaded,
//! later sources overriding earlier ones:
//!
//! 1. built-in defaults ([`ConfigManager::load_defaults`])
//! 2. a TOML, JSON or `.env` style file ([`ConfigManager::load_file`])
//! 3. a `.env` file in the working directory ([`ConfigManager::load_dotenv`])
//! 4. prefixed environment variables ([`ConfigManager::load_env`])
//!
//! ```rust,no_run
//! use lectern_config::ConfigManager;
//!
//! let config = ConfigManager::with_prefix("LECTERN");
//! config.load_dotenv(None)?;
//! let port: u16 = config.get_or("port", 5000);
//! # Ok::<(), lectern_config::ConfigError>(())
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod tree;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(Value::Object(serde_json::Map::new()))),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Seed the tree from a serializable defaults value.
    pub fn load_defaults<T: Serialize>(&self, defaults: &T) -> Result<()> {
        let value = serde_json::to_value(defaults)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::SerializationError(
                "defaults must serialize to a table".to_string(),
            ));
        }
        tree::merge(&mut self.config.write(), value);
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let entries = loader.load();
        debug!(count = entries.len(), prefix = ?self.env_prefix, "Loaded environment configuration");

        let mut config = self.config.write();
        for (key, value) in entries {
            tree::insert(&mut config, &key, value);
        }

        Ok(())
    }

    /// Map plain, unprefixed environment variables onto keys.
    ///
    /// Unset or empty variables are skipped.
    pub fn load_env_aliases(&self, aliases: &[(&str, &str)]) -> Result<()> {
        let mut config = self.config.write();
        for (var, key) in aliases {
            if let Ok(raw) = std::env::var(var) {
                if raw.trim().is_empty() {
                    continue;
                }
                tree::insert(&mut config, key, env::parse_scalar(&raw));
            }
        }
        Ok(())
    }

    /// Load configuration from .env file
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok(); // Ignore if .env doesn't exist
        }
        self.load_env()
    }

    /// Load configuration from a file, detecting the format from its extension
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file_as(path, FileFormat::detect(path)?)
    }

    /// Load configuration from a file in an explicit format
    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        let data = ConfigLoader::new(format).load_file(path)?;
        debug!(path = %path.display(), format = ?format, "Loaded configuration file");

        tree::merge(&mut self.config.write(), data);
        Ok(())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;

        tree::insert(&mut self.config.write(), key, json_value);
        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = {
            let config = self.config.read();
            tree::get(&config, key)
                .cloned()
                .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?
        };

        serde_json::from_value(value).map_err(|e| ConfigError::deserialize(key, e))
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    /// Get a boolean value
    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Check if a key exists
    pub fn has(&self, key: &str) -> bool {
        tree::get(&self.config.read(), key).is_some()
    }

    /// Dotted paths of all leaf values
    pub fn keys(&self) -> Vec<String> {
        tree::leaf_keys(&self.config.read())
    }

    /// Merge configuration from another manager
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        if Arc::ptr_eq(&self.config, &other.config) {
            return Ok(());
        }
        let other_config = other.config.read().clone();
        tree::merge(&mut self.config.write(), other_config);
        Ok(())
    }

    /// Deserialize the whole tree and validate it
    pub fn extract<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let value = self.config.read().clone();

        let extracted: T =
            serde_json::from_value(value).map_err(|e| ConfigError::deserialize("<root>", e))?;

        extracted.validate()?;

        Ok(extracted)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct QueueSection {
        max_attempts: u32,
        retry_delay_ms: u64,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Settings {
        port: u16,
        queue: QueueSection,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                port: 5000,
                queue: QueueSection {
                    max_attempts: 3,
                    retry_delay_ms: 5000,
                },
            }
        }
    }

    impl Validate for Settings {
        fn validate(&self) -> Result<()> {
            ConfigValidator::is_port(self.port, "port")?;
            ConfigValidator::in_range(self.queue.max_attempts, 1, 10, "queue.max_attempts")
        }
    }

    #[test]
    fn test_set_and_get() {
        let manager = ConfigManager::new();
        manager.set("test_key", "test_value").unwrap();

        let value: String = manager.get("test_key").unwrap();
        assert_eq!(value, "test_value");
    }

    #[test]
    fn test_get_or_default() {
        let manager = ConfigManager::new();

        let value: String = manager.get_or("missing_key", "default_value".to_string());
        assert_eq!(value, "default_value");
    }

    #[test]
    fn test_has_key() {
        let manager = ConfigManager::new();
        manager.set("mail.provider", "brevo").unwrap();

        assert!(manager.has("mail.provider"));
        assert!(manager.has("mail"));
        assert!(!manager.has("mail.api_key"));
    }

    #[test]
    fn test_wrong_type_names_key() {
        let manager = ConfigManager::new();
        manager.set("port", "not a number").unwrap();

        let err = manager.get::<u16>("port").unwrap_err();
        assert!(matches!(err, ConfigError::DeserializationError { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_defaults_then_override() {
        let manager = ConfigManager::new();
        manager.load_defaults(&Settings::default()).unwrap();
        manager.set("queue.max_attempts", 5).unwrap();

        let settings: Settings = manager.extract().unwrap();
        assert_eq!(settings.queue.max_attempts, 5);
        assert_eq!(settings.queue.retry_delay_ms, 5000);
        assert_eq!(settings.port, 5000);
    }

    #[test]
    fn test_extract_runs_validation() {
        let manager = ConfigManager::new();
        manager.load_defaults(&Settings::default()).unwrap();
        manager.set("queue.max_attempts", 0).unwrap();

        assert!(matches!(
            manager.extract::<Settings>(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_merge_managers() {
        let base = ConfigManager::new();
        base.load_defaults(&Settings::default()).unwrap();

        let overlay = ConfigManager::new();
        overlay.set("port", 8080).unwrap();

        base.merge(&overlay).unwrap();
        base.merge(&base.clone()).unwrap();

        assert_eq!(base.get::<u16>("port").unwrap(), 8080);
        assert_eq!(
            base.keys(),
            vec!["port", "queue.max_attempts", "queue.retry_delay_ms"]
        );
    }
}
