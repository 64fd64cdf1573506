//! Structured logging setup
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and a JSON or pretty
//! `fmt` layer, optionally writing through a non-blocking `tracing-appender`
//! worker so dispatch threads never block on stdout.
//!
//! ## Environment Variables
//!
//! | Variable                     | Default | Meaning                                  |
//! |------------------------------|---------|------------------------------------------|
//! | `BRRTC_LOG_LEVEL`            | `info`  | trace/debug/info/warn/error              |
//! | `BRRTC_LOG_FORMAT`           | `json`  | `json` or `pretty`                       |
//! | `BRRTC_LOG_ASYNC`            | `false` | buffered output via `tracing-appender`   |
//! | `BRRTC_LOG_TARGET_FILTER`    | unset   | extra directives, e.g. `brrtcontainer::link=trace` |
//! | `BRRTC_LOG_INCLUDE_LOCATION` | `false` | add file and line to every event         |
//!
//! `RUST_LOG` takes precedence over `BRRTC_LOG_LEVEL` when set.

use std::env;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Keeps the non-blocking writer flushing for the life of the process.
static APPENDER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Buffer output through a background writer thread
    pub async_logging: bool,
    /// Extra filter directives (comma-separated)
    pub target_filter: Option<String>,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env::var("BRRTC_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("BRRTC_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            async_logging: env_flag("BRRTC_LOG_ASYNC").unwrap_or(defaults.async_logging),
            target_filter: env::var("BRRTC_LOG_TARGET_FILTER").ok(),
            include_location: env_flag("BRRTC_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }

    /// Pretty, debug-level output with source locations
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            target_filter: None,
            include_location: true,
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));
        for directive in self
            .target_filter
            .iter()
            .flat_map(|f| f.split(','))
            .map(str::trim)
            .filter(|d| !d.is_empty())
        {
            match directive.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(_) => eprintln!("Warning: Invalid log filter directive: {directive}"),
            }
        }
        filter
    }
}

fn env_flag(name: &str) -> Option<bool> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Initialize logging from `BRRTC_LOG_*` environment variables.
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LogConfig::from_env())
}

/// Install the global subscriber described by `config`.
///
/// Fails when a global subscriber is already installed.
///
/// ```no_run
/// use brrtcontainer::logging::{init_logging_with_config, LogConfig};
///
/// init_logging_with_config(&LogConfig::default_dev()).expect("logging");
/// ```
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let writer = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        if APPENDER_GUARD.set(guard).is_err() {
            anyhow::bail!("async logging is already initialized");
        }
        BoxMakeWriter::new(non_blocking)
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")
}
