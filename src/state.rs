//! Shared application state for Axum handlers.
//!
//! Cloned for each request; every field is cheap to clone:
//!
//! - **Configuration**: startup configuration
//! - **Environment**: source of the per-request admission settings
//! - **Upstream**: pooled HTTP client bound to the upstream origin

use std::sync::Arc;

use crate::config::Config;
use crate::env::{EnvironmentReader, ProcessEnv};
use crate::error::AppResult;
use crate::upstream::UpstreamClient;

/// Shared application state for Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Where `PROXY_*` settings are read from on each request
    pub env: Arc<dyn EnvironmentReader>,
    /// Upstream client (shares one connection pool across clones)
    pub upstream: UpstreamClient,
}

impl AppState {
    /// Create state reading admission settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the upstream URL is invalid.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_env(config, Arc::new(ProcessEnv))
    }

    /// Create state reading admission settings from `env`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the upstream URL is invalid.
    pub fn with_env(config: Config, env: Arc<dyn EnvironmentReader>) -> AppResult<Self> {
        let upstream = UpstreamClient::from_config(&config)?;

        Ok(Self {
            config: Arc::new(config),
            env,
            upstream,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::env::StaticEnv;

    #[test]
    fn test_with_env_builds_upstream() {
        let state = AppState::with_env(Config::default(), Arc::new(StaticEnv::new())).unwrap();

        assert_eq!(
            state.upstream.base_url().as_str(),
            "https://generativelanguage.googleapis.com/"
        );
    }

    #[test]
    fn test_with_env_rejects_bad_upstream() {
        let config = Config {
            upstream_base_url: "nope".to_string(),
            ..Config::default()
        };

        assert!(AppState::with_env(config, Arc::new(StaticEnv::new())).is_err());
    }
}
