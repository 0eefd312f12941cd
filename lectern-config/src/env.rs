// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::env;

/// Separator that maps an environment variable onto a nested key.
///
/// `LECTERN_QUEUE__MAX_ATTEMPTS` becomes `queue.max_attempts`.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    /// Create a new environment loader
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.map(|p| p.trim_end_matches('_').to_uppercase()),
        }
    }

    /// Load every matching variable as a `(dotted key, value)` pair.
    pub fn load(&self) -> Vec<(String, Value)> {
        self.load_from(env::vars())
    }

    /// Same as [`load`](Self::load) over an explicit set of variables.
    pub fn load_from<I>(&self, vars: I) -> Vec<(String, Value)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut entries: Vec<(String, Value)> = vars
            .into_iter()
            .filter_map(|(name, value)| {
                let key = self.key_for(&name)?;
                Some((key, parse_scalar(&value)))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Load a specific environment variable
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = if let Some(ref prefix) = self.prefix {
            format!("{}_{}", prefix, key.to_uppercase())
        } else {
            key.to_uppercase()
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Report which of the given variables are set to a non-empty value.
    ///
    /// The prefix is not applied; values are never exposed.
    pub fn presence(names: &[&str]) -> BTreeMap<String, bool> {
        names
            .iter()
            .map(|name| {
                let set = env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
                (name.to_string(), set)
            })
            .collect()
    }

    fn key_for(&self, name: &str) -> Option<String> {
        let rest = match &self.prefix {
            Some(prefix) => name.strip_prefix(prefix.as_str())?.strip_prefix('_')?,
            None => name,
        };
        if rest.is_empty() {
            return None;
        }
        let key = rest
            .split(NESTING_SEPARATOR)
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        Some(key)
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Interpret a raw environment string.
///
/// Booleans and numbers become typed values; everything else stays a string.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = trimmed.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        if f.is_finite() && !trimmed.starts_with('.') {
            return Value::from(f);
        }
    }
    Value::String(raw.to_string())
}
