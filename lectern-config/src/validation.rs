//! Rules applied after a configuration is deserialized.

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by settings structs; run by
/// [`ConfigManager::extract`](crate::ConfigManager::extract).
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn ensure(ok: bool, field: &str, reason: impl FnOnce() -> String) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, reason()))
    }
}

/// Field checks. Each takes the dotted field name for the error message.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Rejects blank strings, including whitespace-only ones.
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        ensure(!value.trim().is_empty(), field, || "must not be empty".into())
    }

    /// Inclusive on both ends.
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        ensure(value >= min && value <= max, field, || {
            format!("must be between {min} and {max} (got {value})")
        })
    }

    pub fn is_url(value: &str, field: &str) -> Result<()> {
        let host = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .unwrap_or_default();
        ensure(!host.is_empty() && !host.starts_with('/'), field, || {
            format!("'{value}' is not an http(s) URL")
        })
    }

    /// Shape check only: something before `@` and a dotted domain after it.
    pub fn is_email(value: &str, field: &str) -> Result<()> {
        let ok = value.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.ends_with('.')
        });
        ensure(ok, field, || format!("'{value}' is not an email address"))
    }

    pub fn is_port(value: u16, field: &str) -> Result<()> {
        ensure(value != 0, field, || "port 0 is not allowed".into())
    }
}
