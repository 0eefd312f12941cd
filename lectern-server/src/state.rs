//! Shared application state.

use lectern_config::EnvLoader;
use lectern_mail::EmailQueue;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Variables reported by the detailed health check.
pub const REPORTED_ENV: &[&str] = &[
    "DATABASE_URL",
    "BREVO_API_KEY",
    "BREVO_FROM_EMAIL",
    "CLOUDINARY_CLOUD_NAME",
    "CLOUDINARY_API_KEY",
    "CLOUDINARY_API_SECRET",
];

/// Reports which variables are set, without their values.
pub type PresenceProbe = fn(&[&str]) -> BTreeMap<String, bool>;

/// Everything request handlers need, built once at startup.
pub struct AppState {
    pub queue: EmailQueue,
    pub environment: String,
    pub version: &'static str,
    /// Subset of [`REPORTED_ENV`] whose absence makes the service unhealthy.
    pub required_env: &'static [&'static str],
    started: Instant,
    presence: PresenceProbe,
}

impl AppState {
    pub fn new(queue: EmailQueue, environment: impl Into<String>) -> Self {
        Self {
            queue,
            environment: environment.into(),
            version: env!("CARGO_PKG_VERSION"),
            required_env: &[],
            started: Instant::now(),
            presence: EnvLoader::presence,
        }
    }

    pub fn with_required_env(mut self, required: &'static [&'static str]) -> Self {
        self.required_env = required;
        self
    }

    /// Replace the process-environment probe.
    pub fn with_presence_probe(mut self, probe: PresenceProbe) -> Self {
        self.presence = probe;
        self
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn env_presence(&self) -> BTreeMap<String, bool> {
        (self.presence)(REPORTED_ENV)
    }
}
