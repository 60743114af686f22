//! IPv4 allow-list rules.
//!
//! `PROXY_ALLOW_IPS` holds a comma-separated list of exact IPv4 addresses and
//! IPv4 CIDR blocks, e.g. `"1.2.3.4, 10.0.0.0/8"`. Each entry becomes an
//! [`IpRule`].
//!
//! # Malformed Entries
//!
//! An entry that cannot be parsed is kept as [`IpRule::Malformed`] and simply
//! never matches. A typo in the allow-list narrows who gets through; it never
//! takes the proxy down and never widens access.
//!
//! # IPv6
//!
//! Matching is IPv4-only. A client address that does not parse as IPv4 is
//! never allowed by any rule.

use std::fmt;
use std::net::Ipv4Addr;

/// A single allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpRule {
    /// Matches exactly one address.
    Exact(Ipv4Addr),
    /// Matches every address sharing the first `prefix_len` bits of `network`.
    Cidr {
        /// Network address (host bits are ignored when matching)
        network: Ipv4Addr,
        /// Prefix length, always in `0..=32`
        prefix_len: u8,
    },
    /// Unparseable entry, kept for logging. Never matches.
    Malformed(String),
}

impl IpRule {
    /// Parse one trimmed allow-list entry.
    ///
    /// Entries containing `/` are CIDR blocks, everything else is an exact
    /// address. This never fails; bad input yields [`IpRule::Malformed`].
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();

        if let Some((base, bits)) = entry.split_once('/') {
            let network = base.trim().parse::<Ipv4Addr>();
            let prefix_len = bits.trim().parse::<u8>();
            return match (network, prefix_len) {
                (Ok(network), Ok(prefix_len)) if prefix_len <= 32 => {
                    IpRule::Cidr { network, prefix_len }
                }
                _ => IpRule::Malformed(entry.to_string()),
            };
        }

        match entry.parse::<Ipv4Addr>() {
            Ok(ip) => IpRule::Exact(ip),
            Err(_) => IpRule::Malformed(entry.to_string()),
        }
    }

    /// Check whether `ip` is covered by this rule.
    pub fn matches(&self, ip: Ipv4Addr) -> bool {
        match self {
            IpRule::Exact(allowed) => *allowed == ip,
            IpRule::Cidr {
                network,
                prefix_len,
            } => {
                let mask = prefix_mask(*prefix_len);
                (u32::from(ip) & mask) == (u32::from(*network) & mask)
            }
            IpRule::Malformed(_) => false,
        }
    }

    /// Whether this rule can ever match anything.
    pub fn is_malformed(&self) -> bool {
        matches!(self, IpRule::Malformed(_))
    }
}

impl fmt::Display for IpRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpRule::Exact(ip) => write!(f, "{ip}"),
            IpRule::Cidr {
                network,
                prefix_len,
            } => write!(f, "{network}/{prefix_len}"),
            IpRule::Malformed(raw) => write!(f, "{raw} (malformed)"),
        }
    }
}

/// Netmask for a prefix length. `/0` yields an all-zero mask.
#[inline]
fn prefix_mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix_len.min(32)))
    }
}

/// Split a raw `PROXY_ALLOW_IPS` value into rules.
///
/// Entries are trimmed and empty entries are discarded, so `" , 1.2.3.4,"`
/// yields a single rule.
pub fn parse_rules(raw: &str) -> Vec<IpRule> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(IpRule::parse)
        .collect()
}

/// Check whether `ip` is allowed by any of `rules`.
///
/// Returns `false` when `ip` is not a valid IPv4 address.
pub fn is_allowed(ip: &str, rules: &[IpRule]) -> bool {
    match ip.trim().parse::<Ipv4Addr>() {
        Ok(addr) => rules.iter().any(|rule| rule.matches(addr)),
        Err(_) => false,
    }
}

/// String-level CIDR membership test.
///
/// ```rust
/// use palm_proxy::allowlist::ip_in_cidr;
///
/// assert!(ip_in_cidr("192.168.1.5", "192.168.1.0/24"));
/// assert!(!ip_in_cidr("192.168.2.5", "192.168.1.0/24"));
/// assert!(ip_in_cidr("8.8.8.8", "0.0.0.0/0"));
/// ```
///
/// Returns `false` if either side is malformed or `cidr` has no prefix.
pub fn ip_in_cidr(ip: &str, cidr: &str) -> bool {
    if !cidr.contains('/') {
        return false;
    }
    is_allowed(ip, &[IpRule::parse(cidr)])
}
