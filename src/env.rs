//! Environment lookup capability.
//!
//! The proxy re-reads its per-request settings (`PROXY_TOKEN`,
//! `PROXY_ALLOW_IPS`, `PROXY_SHOW_INDEX`) on every request. Rather than
//! reaching into the process environment ambiently, the pipeline is handed an
//! [`EnvironmentReader`] through [`AppState`](crate::AppState), so tests can
//! swap in a [`StaticEnv`].

use std::collections::HashMap;
use std::env;

/// Read-only key/value lookup into the execution environment.
pub trait EnvironmentReader: Send + Sync {
    /// Return the value for `key`, or `None` if it is not set.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
///
/// Values loaded from a `.env` file by `dotenvy` at startup are visible here
/// too, since `dotenvy` writes into the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvironmentReader for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// Fixed in-memory environment, mainly for tests and embedding.
///
/// # Example
///
/// ```rust
/// use palm_proxy::env::{EnvironmentReader, StaticEnv};
///
/// let env = StaticEnv::new().with("PROXY_TOKEN", "secret");
/// assert_eq!(env.lookup("PROXY_TOKEN").as_deref(), Some("secret"));
/// assert_eq!(env.lookup("PROXY_ALLOW_IPS"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    vars: HashMap<String, String>,
}

impl StaticEnv {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for StaticEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvironmentReader for StaticEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}
