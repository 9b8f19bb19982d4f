use std::str::FromStr;

use wps_core::error::CoreError;
use wps_core::polling::{
    PollingConfig, DEFAULT_BASE_POLLING_DELAY_MS, DEFAULT_MAX_POLLING_DELAY_MS,
};
use wps_engine::config::DEFAULT_RESULT_RETENTION;
use wps_engine::EngineConfig;

/// A configuration variable that could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a valid {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },

    #[error("{var}: {source}")]
    Engine {
        var: &'static str,
        #[source]
        source: CoreError,
    },
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(other.to_string()),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long in-flight jobs get to unwind after the server stops (default: `10`).
    pub shutdown_grace_secs: u64,
    pub log_format: LogFormat,
    /// Polling window and result retention handed to the job engine.
    pub engine: EngineConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `8080`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `WPS_BASE_POLLING_DELAY_MS` | `1000`                  |
    /// | `WPS_MAX_POLLING_DELAY_MS`  | `60000`                 |
    /// | `WPS_RESULT_RETENTION`      | `P0Y0D1H0M0S`           |
    /// | `WPS_SHUTDOWN_GRACE_SECS`   | `10`                    |
    /// | `LOG_FORMAT`                | `text`                  |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", 8080, "u16")?;

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", 30, "u64")?;
        let shutdown_grace_secs: u64 = env_parse("WPS_SHUTDOWN_GRACE_SECS", 10, "u64")?;
        let log_format: LogFormat =
            env_parse("LOG_FORMAT", LogFormat::Text, "log format (text|json)")?;

        let base_delay_ms: u64 =
            env_parse("WPS_BASE_POLLING_DELAY_MS", DEFAULT_BASE_POLLING_DELAY_MS, "u64")?;
        let max_delay_ms: u64 =
            env_parse("WPS_MAX_POLLING_DELAY_MS", DEFAULT_MAX_POLLING_DELAY_MS, "u64")?;
        let retention = std::env::var("WPS_RESULT_RETENTION")
            .unwrap_or_else(|_| DEFAULT_RESULT_RETENTION.into());

        let engine = EngineConfig::default()
            .with_polling(PollingConfig::new(base_delay_ms, max_delay_ms))
            .with_retention(&retention)
            .map_err(|source| ConfigError::Engine {
                var: "WPS_RESULT_RETENTION",
                source,
            })?;

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_grace_secs,
            log_format,
            engine,
        })
    }
}

/// Read `var`, falling back to `default` when it is unset.
fn env_parse<T: FromStr>(
    var: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value,
        }),
        Err(_) => Ok(default),
    }
}
