//! Lectern Logging
//!
//! Installs the process-wide `tracing` subscriber for the Lectern services.
//! Every crate in the workspace logs through the `tracing` macros with
//! structured fields; this crate only decides where those events go.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lectern_log::LogConfig;
//!
//! let _guard = lectern_log::init(&LogConfig::from_env()).expect("logging");
//! tracing::info!(port = 5000, "Server starting");
//! ```
//!
//! # Environment Variables
//!
//! - `LECTERN_DEBUG=1` - Enable debug logging
//! - `LECTERN_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `LECTERN_LOG_FORMAT=pretty|json|compact` - Set console format
//! - `LECTERN_LOG_COLOR=1|0` - Enable/disable ANSI colors
//! - `LECTERN_LOG_DIR=/var/log/lectern` - Also write rolling `app.log` and `error.log`
//! - `LECTERN_LOG_ROTATION=hourly|daily|never` - Rotation of the log files
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Errors raised while configuring logging.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),

    #[error("Unknown log format: {0}")]
    InvalidFormat(String),

    #[error("Unknown rotation: {0}")]
    InvalidRotation(String),

    #[error("Failed to install subscriber: {0}")]
    Init(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Log Levels
// ============================================================================

/// Minimum level of events that are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
    /// Off (no logging)
    Off,
}

impl Level {
    /// Directive understood by [`EnvFilter`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "off" | "none" => Ok(Level::Off),
            _ => Err(LogError::InvalidLevel(s.to_string())),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Console output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// One JSON object per event
    #[default]
    Json,
}

impl FromStr for Format {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Format::Pretty),
            "compact" => Ok(Format::Compact),
            "json" => Ok(Format::Json),
            _ => Err(LogError::InvalidFormat(s.to_string())),
        }
    }
}

/// How often the log files roll over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl Rotation {
    fn to_tracing_rotation(self) -> tracing_appender::rolling::Rotation {
        match self {
            Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
            Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
        }
    }
}

impl FromStr for Rotation {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hourly" => Ok(Rotation::Hourly),
            "daily" => Ok(Rotation::Daily),
            "never" => Ok(Rotation::Never),
            _ => Err(LogError::InvalidRotation(s.to_string())),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Console format
    pub format: Format,
    /// Whether ANSI colors are used on the console
    pub color: bool,
    /// Directory for `app.log` and `error.log`; console only when unset
    pub directory: Option<PathBuf>,
    /// Rotation of the log files
    pub rotation: Rotation,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false, // JSON output doesn't use colors
            directory: None,
            rotation: Rotation::Daily,
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create config from an arbitrary variable lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let debug = flag("LECTERN_DEBUG").unwrap_or(false);

        let level = lookup("LECTERN_LOG_LEVEL")
            .and_then(|s| s.parse().ok())
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("LECTERN_LOG_FORMAT")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let color = flag("LECTERN_LOG_COLOR")
            .unwrap_or_else(|| format != Format::Json && lookup("NO_COLOR").is_none());

        let directory = lookup("LECTERN_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let rotation = lookup("LECTERN_LOG_ROTATION")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            debug,
            level,
            format,
            color,
            directory,
            rotation,
        }
    }

    /// Level actually applied, accounting for the debug flag.
    pub fn effective_level(&self) -> Level {
        if self.debug && self.level > Level::Debug {
            Level::Debug
        } else {
            self.level
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.effective_level().as_str()))
    }
}

// ============================================================================
// Subscriber
// ============================================================================

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps the background file writers alive.
///
/// Buffered events are flushed when the guard is dropped, so hold it for the
/// lifetime of the process.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    guards: Vec<WorkerGuard>,
}

impl LogGuard {
    /// Number of file writers kept alive.
    pub fn writers(&self) -> usize {
        self.guards.len()
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<LogGuard, LogError> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut guards = Vec::new();

    layers.push(console_layer(config));

    if let Some(directory) = &config.directory {
        std::fs::create_dir_all(directory)?;
        let rotation = config.rotation.to_tracing_rotation();

        let app = RollingFileAppender::new(rotation.clone(), directory, "app.log");
        let (writer, guard) = tracing_appender::non_blocking(app);
        guards.push(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );

        let errors = RollingFileAppender::new(rotation, directory, "error.log");
        let (writer, guard) = tracing_appender::non_blocking(errors);
        guards.push(guard);
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(LevelFilter::ERROR)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(config.env_filter())
        .try_init()
        .map_err(|e| LogError::Init(e.to_string()))?;

    tracing::debug!(
        level = %config.effective_level(),
        files = guards.len(),
        "Logging initialized"
    );

    Ok(LogGuard { guards })
}

fn console_layer(config: &LogConfig) -> BoxedLayer {
    match config.format {
        Format::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        Format::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_ansi(config.color)
            .boxed(),
        Format::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_ansi(config.color)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
    }
}

// ============================================================================
// Tests
// ============================================================================
