//! Tracing subscriber setup.
//!
//! The driver itself only emits `tracing` events and spans; applications
//! embedding it can install a subscriber here, configured from
//! [`LoggingConfig`]. `RUST_LOG` takes precedence over the configured level.
//!
//! # Example
//! ```no_run
//! use master8::logging::{self, LoggingConfig, OutputFormat};
//!
//! # fn main() -> master8::Result<()> {
//! let config = LoggingConfig {
//!     level: "debug".into(),
//!     format: OutputFormat::Compact,
//! };
//! logging::init(&config)?;
//! tracing::info!("stimulator session started");
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::error::{Master8Error, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line, colored (for development)
    #[default]
    Pretty,
    /// Single-line without colors
    Compact,
    /// JSON objects for log aggregation
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: OutputFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Reject unknown level names.
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.level).map(|_| ())
    }
}

/// Install a global subscriber for `config`.
///
/// Idempotent: if a global subscriber is already set, this returns `Ok(())`.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let level = parse_log_level(&config.level)?;
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        OutputFormat::Pretty => fmt::layer().pretty().with_filter(env_filter).boxed(),
        OutputFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(false)
            .with_filter(env_filter)
            .boxed(),
        OutputFormat::Json => fmt::layer().json().with_filter(env_filter).boxed(),
    };

    // A second initialisation is expected in tests and when the host
    // application already set up tracing.
    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// Parse log level string into tracing Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(Master8Error::Configuration(format!(
            "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
            level
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert!(matches!(parse_log_level("trace"), Ok(Level::TRACE)));
        assert!(matches!(parse_log_level("debug"), Ok(Level::DEBUG)));
        assert!(matches!(parse_log_level("info"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("warn"), Ok(Level::WARN)));
        assert!(matches!(parse_log_level("error"), Ok(Level::ERROR)));

        // Case insensitive
        assert!(matches!(parse_log_level("INFO"), Ok(Level::INFO)));
        assert!(matches!(parse_log_level("Debug"), Ok(Level::DEBUG)));

        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(LoggingConfig::default().validate().is_ok());

        let bad = LoggingConfig {
            level: "loud".into(),
            format: OutputFormat::Json,
        };
        assert!(bad.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn test_format_names() {
        let config: LoggingConfig = toml::from_str("level = \"warn\"\nformat = \"json\"").unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.level, "warn");
    }
}
