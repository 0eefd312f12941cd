//! Service configuration.
//!
//! Layered with [`ConfigManager`]: built-in defaults, then `lectern.toml` (or
//! the file named by `LECTERN_CONFIG`), then `.env`, then the plain variables
//! hosting platforms set (`PORT`, `BREVO_API_KEY`, ...), then `LECTERN_*`
//! variables, which win.

use lectern_config::{ConfigError, ConfigManager, ConfigValidator, Validate};
use lectern_mail::{
    BREVO_ENDPOINT, BrevoConfig, DEFAULT_FROM_NAME, Mailer, MailerConfig, SmtpConfig,
    SmtpSecurity,
};
use lectern_queue::{JanitorConfig, QueueConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::ServerError;

/// Prefix of the structured environment variables.
pub const ENV_PREFIX: &str = "LECTERN";

/// Config file read when present and `LECTERN_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "lectern.toml";

/// Unprefixed variables and the keys they feed.
pub const ENV_ALIASES: &[(&str, &str)] = &[
    ("HOST", "host"),
    ("PORT", "port"),
    ("ENVIRONMENT", "environment"),
    ("BREVO_API_KEY", "mail.api_key"),
    ("BREVO_FROM_EMAIL", "mail.from_email"),
    ("KEEP_WARM_ENABLED", "keep_warm.enabled"),
    ("KEEP_WARM_URL", "keep_warm.url"),
    ("KEEP_WARM_PATH", "keep_warm.path"),
    ("KEEP_WARM_INTERVAL_MIN", "keep_warm.interval_min"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    /// How long shutdown waits for the email queue to drain.
    pub shutdown_timeout_secs: u64,
    pub mail: MailSettings,
    pub queue: QueueSettings,
    pub janitor: JanitorSettings,
    pub keep_warm: KeepWarmSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: "development".to_string(),
            shutdown_timeout_secs: 10,
            mail: MailSettings::default(),
            queue: QueueSettings::default(),
            janitor: JanitorSettings::default(),
            keep_warm: KeepWarmSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    #[default]
    Brevo,
    Smtp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSettings {
    pub provider: MailProvider,
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub reply_to: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub smtp: SmtpSettings,
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            provider: MailProvider::Brevo,
            api_key: String::new(),
            from_email: String::new(),
            from_name: DEFAULT_FROM_NAME.to_string(),
            reply_to: None,
            endpoint: BREVO_ENDPOINT.to_string(),
            timeout_secs: 30,
            smtp: SmtpSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: Option<u16>,
    pub security: SmtpSecurity,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: "smtp-relay.brevo.com".to_string(),
            port: None,
            security: SmtpSecurity::StartTls,
            username: None,
            password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        let defaults = QueueConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            retry_delay_ms: defaults.retry_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JanitorSettings {
    pub interval_secs: u64,
    pub sweep_failed: bool,
}

impl Default for JanitorSettings {
    fn default() -> Self {
        let defaults = JanitorConfig::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            sweep_failed: defaults.sweep_failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepWarmSettings {
    pub enabled: bool,
    /// Base URL to ping; falls back to `RENDER_EXTERNAL_URL`, then
    /// `PUBLIC_BASE_URL`, then [`default_url`](Self::default_url).
    pub url: Option<String>,
    pub default_url: String,
    pub path: String,
    pub interval_min: u64,
    pub initial_delay_secs: u64,
    pub jitter_secs: u64,
    pub timeout_secs: u64,
}

impl Default for KeepWarmSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            default_url: "https://iccict-api.onrender.com".to_string(),
            path: "/health".to_string(),
            interval_min: 10,
            initial_delay_secs: 60,
            jitter_secs: 20,
            timeout_secs: 8,
        }
    }
}

impl ServerConfig {
    /// Load every layer. `file` overrides the default config file location;
    /// a missing default file is not an error.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let manager = ConfigManager::with_prefix(ENV_PREFIX);
        manager.load_defaults(&Self::default())?;

        match file {
            Some(path) => manager.load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                manager.load_file(DEFAULT_CONFIG_FILE)?
            }
            None => debug!("No config file, using defaults and environment"),
        }

        manager.load_dotenv(None)?;
        manager.load_env_aliases(ENV_ALIASES)?;
        manager.load_env()?;

        Self::from_manager(&manager)
    }

    pub fn from_manager(manager: &ConfigManager) -> Result<Self, ConfigError> {
        manager.extract()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig::default()
            .max_attempts(self.queue.max_attempts)
            .retry_delay(Duration::from_millis(self.queue.retry_delay_ms))
    }

    pub fn janitor_config(&self) -> JanitorConfig {
        JanitorConfig::default()
            .interval(Duration::from_secs(self.janitor.interval_secs))
            .sweep_failed(self.janitor.sweep_failed)
    }
}

impl MailSettings {
    /// Environment variables a deployment must set for this provider.
    pub fn required_env(&self) -> &'static [&'static str] {
        match self.provider {
            MailProvider::Brevo => &["BREVO_API_KEY", "BREVO_FROM_EMAIL"],
            MailProvider::Smtp => &[],
        }
    }

    /// Build the mailer for the configured provider.
    pub fn build_mailer(&self) -> Result<Mailer, ServerError> {
        let mailer = match self.provider {
            MailProvider::Brevo => Mailer::brevo(
                BrevoConfig::new(self.api_key.clone())
                    .endpoint(self.endpoint.clone())
                    .timeout(Duration::from_secs(self.timeout_secs)),
            )?,
            MailProvider::Smtp => {
                let mut smtp = SmtpConfig::new(self.smtp.host.clone())
                    .security(self.smtp.security)
                    .timeout(Duration::from_secs(self.timeout_secs));
                if let Some(port) = self.smtp.port {
                    smtp = smtp.port(port);
                }
                if let (Some(user), Some(pass)) = (&self.smtp.username, &self.smtp.password) {
                    smtp = smtp.credentials(user.clone(), pass.clone());
                }
                Mailer::smtp(smtp)?
            }
        };

        let mut identity = MailerConfig::default()
            .from(&self.from_email)?
            .from_name(self.from_name.clone());
        if let Some(reply_to) = self.reply_to.as_deref().filter(|r| !r.trim().is_empty()) {
            identity = identity.reply_to(reply_to)?;
        }

        Ok(mailer.with_config(identity))
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> lectern_config::Result<()> {
        ConfigValidator::not_empty(&self.host, "host")?;
        ConfigValidator::is_port(self.port, "port")?;
        ConfigValidator::in_range(self.shutdown_timeout_secs, 0, 300, "shutdown_timeout_secs")?;

        ConfigValidator::is_email(&self.mail.from_email, "mail.from_email")?;
        ConfigValidator::in_range(self.mail.timeout_secs, 1, 300, "mail.timeout_secs")?;
        match self.mail.provider {
            MailProvider::Brevo => {
                ConfigValidator::not_empty(&self.mail.api_key, "mail.api_key")?;
                ConfigValidator::is_url(&self.mail.endpoint, "mail.endpoint")?;
            }
            MailProvider::Smtp => ConfigValidator::not_empty(&self.mail.smtp.host, "mail.smtp.host")?,
        }

        ConfigValidator::in_range(self.queue.max_attempts, 1, 10, "queue.max_attempts")?;
        ConfigValidator::in_range(self.janitor.interval_secs, 1, 7 * 24 * 3600, "janitor.interval_secs")?;

        if self.keep_warm.enabled {
            ConfigValidator::in_range(self.keep_warm.interval_min, 1, 24 * 60, "keep_warm.interval_min")?;
            ConfigValidator::in_range(self.keep_warm.timeout_secs, 1, 60, "keep_warm.timeout_secs")?;
            if let Some(url) = &self.keep_warm.url {
                ConfigValidator::is_url(url, "keep_warm.url")?;
            }
        }

        Ok(())
    }
}
