//! Per-request proxy settings.
//!
//! Unlike [`Config`](crate::Config), which is loaded once at startup, these
//! three settings are re-resolved from the [`EnvironmentReader`] for every
//! request:
//!
//! | Key | Effect |
//! |---|---|
//! | `PROXY_TOKEN` | enables token authentication when set |
//! | `PROXY_ALLOW_IPS` | comma-separated IPv4 / CIDR allow-list; enables IP filtering when non-empty |
//! | `PROXY_SHOW_INDEX` | hides the index page only on `0`, `false`, `off`, `no` |
//!
//! Empty values are treated the same as unset. A `PROXY_ALLOW_IPS` value that
//! is non-empty but yields no rules (e.g. `" , "`) still enables filtering and
//! rejects every client.

use tracing::debug;

use crate::allowlist::{IpRule, parse_rules};
use crate::env::EnvironmentReader;

/// Shared secret required from callers.
pub const PROXY_TOKEN_KEY: &str = "PROXY_TOKEN";

/// IP allow-list.
pub const PROXY_ALLOW_IPS_KEY: &str = "PROXY_ALLOW_IPS";

/// Index page toggle.
pub const PROXY_SHOW_INDEX_KEY: &str = "PROXY_SHOW_INDEX";

/// Values of `PROXY_SHOW_INDEX` (after trim + lowercase) that hide the index.
const INDEX_OFF_VALUES: [&str; 4] = ["0", "false", "off", "no"];

/// Settings resolved for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxySettings {
    /// Token callers must present (`None` = authentication disabled)
    pub required_token: Option<String>,
    /// Allow-list rules
    pub allow_ip_rules: Vec<IpRule>,
    /// Whether `PROXY_ALLOW_IPS` was set to a non-empty value
    pub ip_filter_configured: bool,
    /// Whether `GET /` answers with the index payload instead of forwarding
    pub show_index: bool,
}

impl ProxySettings {
    /// Resolve settings from the environment.
    ///
    /// Never fails: malformed allow-list entries become ineffective rules and
    /// unknown `PROXY_SHOW_INDEX` values leave the index enabled.
    pub fn resolve(env: &dyn EnvironmentReader) -> Self {
        let required_token = env.lookup(PROXY_TOKEN_KEY).filter(|t| !t.is_empty());

        let allow_ips_raw = env.lookup(PROXY_ALLOW_IPS_KEY).filter(|raw| !raw.is_empty());
        let ip_filter_configured = allow_ips_raw.is_some();
        let allow_ip_rules = allow_ips_raw
            .map(|raw| parse_rules(&raw))
            .unwrap_or_default();

        for rule in allow_ip_rules.iter().filter(|r| r.is_malformed()) {
            debug!(rule = %rule, "Ignoring malformed PROXY_ALLOW_IPS entry");
        }

        let show_index = env
            .lookup(PROXY_SHOW_INDEX_KEY)
            .map(|v| parse_show_index(&v))
            .unwrap_or(true);

        Self {
            required_token,
            allow_ip_rules,
            ip_filter_configured,
            show_index,
        }
    }

    /// Check if token authentication is enabled.
    pub fn auth_enabled(&self) -> bool {
        self.required_token.is_some()
    }

    /// Check if IP filtering is enabled.
    ///
    /// Follows the raw setting, not the parsed rules: a configured list with
    /// no usable rules rejects everyone.
    pub fn ip_filter_enabled(&self) -> bool {
        self.ip_filter_configured
    }
}

fn parse_show_index(raw: &str) -> bool {
    let value = raw.trim().to_ascii_lowercase();
    value.is_empty() || !INDEX_OFF_VALUES.contains(&value.as_str())
}
