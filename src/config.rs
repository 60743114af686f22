//! Server configuration loaded from environment variables.
//!
//! # Startup vs Per-Request Settings
//!
//! This module covers settings fixed for the life of the process (bind
//! address, upstream origin, logging, metrics). The admission settings
//! `PROXY_TOKEN`, `PROXY_ALLOW_IPS` and `PROXY_SHOW_INDEX` are
//! not here: they are re-read for every request, see
//! [`ProxySettings`](crate::settings::ProxySettings).
//!
//! # Variables
//!
//! - `HOST` / `PORT`: bind address (default `0.0.0.0:8787`)
//! - `UPSTREAM_BASE_URL`: upstream origin (default: Google generative language API)
//! - `UPSTREAM_CONNECT_TIMEOUT_SECS`: connect timeout toward upstream (default: 10)
//! - `RUST_LOG`: tracing filter (default: `info`)
//! - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `METRICS_PORT`: Prometheus listener port, `0` disables (default: 0)

use std::env;
use std::time::Duration;

use url::Url;

use crate::error::{AppError, AppResult};

/// Upstream origin every request is forwarded to.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for terminals
    #[default]
    Pretty,
    /// One JSON object per line, for log aggregation
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Proxy will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8787)
    pub port: u16,

    // =========================================================================
    // Upstream Configuration
    // =========================================================================
    /// Origin requests are forwarded to. Only scheme, host and port are used;
    /// the inbound path replaces any path on this URL.
    pub upstream_base_url: String,

    /// Timeout for establishing a connection to upstream (default: 10s).
    /// There is no total request timeout: bodies may stream indefinitely.
    pub upstream_connect_timeout: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Log output format (default: pretty)
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value is invalid
    /// (e.g., non-numeric PORT, unparseable UPSTREAM_BASE_URL).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8787)?,

            // Upstream
            upstream_base_url: env::var("UPSTREAM_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.to_string()),
            upstream_connect_timeout: Duration::from_secs(Self::parse_env(
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                10,
            )?),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    pub fn validate(&self) -> AppResult<()> {
        self.upstream_url()?;

        if self.upstream_connect_timeout.is_zero() {
            return Err(AppError::ConfigError(
                "UPSTREAM_CONNECT_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse and check the upstream origin.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` unless the URL is absolute `http` or
    /// `https` with a host.
    pub fn upstream_url(&self) -> AppResult<Url> {
        let url = Url::parse(&self.upstream_base_url).map_err(|e| {
            AppError::ConfigError(format!(
                "Invalid UPSTREAM_BASE_URL '{}': {e}",
                self.upstream_base_url
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "UPSTREAM_BASE_URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if url.host_str().is_none() {
            return Err(AppError::ConfigError(
                "UPSTREAM_BASE_URL must include a host".to_string(),
            ));
        }

        Ok(url)
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 8787,
            // Upstream
            upstream_base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            upstream_connect_timeout: Duration::from_secs(10),
            // Observability
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 0,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8787);
        assert_eq!(config.upstream_base_url, DEFAULT_UPSTREAM_BASE_URL);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.metrics_enabled());
    }

    #[test]
    fn test_server_addr_format() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 9000,
            ..Config::default()
        };

        assert_eq!(config.server_addr(), "127.0.0.1:9000");
    }

    #[test]
    fn test_metrics_addr() {
        assert!(Config::default().metrics_addr().is_none());

        let config = Config {
            metrics_port: 9090,
            ..Config::default()
        };
        assert_eq!(config.metrics_addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_upstream_not_a_url() {
        let config = Config {
            upstream_base_url: "generativelanguage".to_string(),
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("UPSTREAM_BASE_URL")
        );
    }

    #[test]
    fn test_validate_upstream_scheme() {
        let config = Config {
            upstream_base_url: "ftp://example.com".to_string(),
            ..Config::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_connect_timeout() {
        let config = Config {
            upstream_connect_timeout: Duration::ZERO,
            ..Config::default()
        };

        let result = config.validate();
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("UPSTREAM_CONNECT_TIMEOUT_SECS")
        );
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
