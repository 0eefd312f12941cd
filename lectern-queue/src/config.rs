//! Queue and janitor settings.

use crate::error::{QueueError, QueueResult};
use std::time::Duration;

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Attempts per job, including the first one.
    pub max_attempts: u32,
    /// Base retry delay; attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl QueueConfig {
    /// Set the attempt ceiling.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the base retry delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.max_attempts == 0 {
            return Err(QueueError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Janitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JanitorConfig {
    /// Time between sweeps.
    pub interval: Duration,
    /// Also remove failed jobs. Off by default so failures stay inspectable.
    pub sweep_failed: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60 * 60),
            sweep_failed: false,
        }
    }
}

impl JanitorConfig {
    /// Set the sweep interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Also remove failed jobs on each sweep.
    pub fn sweep_failed(mut self, enabled: bool) -> Self {
        self.sweep_failed = enabled;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.interval.is_zero() {
            return Err(QueueError::Config(
                "janitor interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
