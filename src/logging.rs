//! Logging initialization and the leveled logging entry point.
//!
//! Output is structured `tracing` events rendered as JSON (production) or
//! pretty text (development). Events are handed to a `tracing-appender`
//! non-blocking writer so request threads never wait on log I/O.
//!
//! ## Environment Variables
//!
//! - `ACTIONSERVER_LOG_LEVEL`: trace/debug/info/warn/error (default `info`)
//! - `ACTIONSERVER_LOG_FORMAT`: `json` or `pretty` (default `json`)
//! - `ACTIONSERVER_LOG_ASYNC`: buffer output on a background writer (default `true`)
//! - `ACTIONSERVER_LOG_INCLUDE_LOCATION`: include file:line (default `false`)
//!
//! `RUST_LOG` takes precedence over `ACTIONSERVER_LOG_LEVEL` when set.

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log format: JSON for production, pretty-print for development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Severity accepted by [`log_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level: trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Buffer output on a background writer thread
    pub async_logging: bool,
    /// Include file:line location (dev only)
    pub include_location: bool,
}

impl LogConfig {
    /// Parse configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("ACTIONSERVER_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("ACTIONSERVER_LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
            ),
            async_logging: env::var("ACTIONSERVER_LOG_ASYNC")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(true),
            include_location: env::var("ACTIONSERVER_LOG_INCLUDE_LOCATION")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }

    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            include_location: true,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber.
///
/// Returns the appender guard when output is buffered; the caller must keep it
/// alive until shutdown so buffered lines are flushed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let level = parse_level(&config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(non_blocking),
            Some(guard),
        )
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
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
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Emit a leveled log entry, optionally carrying a failure.
///
/// The failure is rendered with its full cause chain.
pub fn log_message(message: &str, level: LogLevel, failure: Option<&anyhow::Error>) {
    match (level, failure) {
        (LogLevel::Debug, None) => tracing::debug!("{message}"),
        (LogLevel::Debug, Some(err)) => tracing::debug!(error = ?err, "{message}"),
        (LogLevel::Info, None) => tracing::info!("{message}"),
        (LogLevel::Info, Some(err)) => tracing::info!(error = ?err, "{message}"),
        (LogLevel::Warning, None) => tracing::warn!("{message}"),
        (LogLevel::Warning, Some(err)) => tracing::warn!(error = ?err, "{message}"),
        (LogLevel::Error, None) => tracing::error!("{message}"),
        (LogLevel::Error, Some(err)) => tracing::error!(error = ?err, "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("PRETTY"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Json);
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(Level::from(LogLevel::Warning), Level::WARN);
        assert_eq!(Level::from(LogLevel::Error), Level::ERROR);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("bogus"), Level::INFO);
    }

    #[test]
    fn test_log_message_without_subscriber_is_silent() {
        log_message("no subscriber installed", LogLevel::Error, None);
        let err = anyhow::anyhow!("root").context("outer");
        log_message("with failure", LogLevel::Warning, Some(&err));
    }
}
