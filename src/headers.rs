//! Header sanitization in both directions.
//!
//! # Outbound (client → upstream)
//!
//! Only headers on an explicit allow-list are forwarded:
//!
//! - `content-type`
//! - `authorization` (dropped if it carries a `Basic` credential)
//! - `x-goog-api-client`
//! - `x-goog-api-key`
//! - `accept-encoding`
//!
//! A `Basic` authorization header comes from the hosting platform's own
//! password protection (or from a caller authenticating to this proxy), never
//! from the caller's intended upstream credential, and would collide with the
//! upstream's bearer auth.
//!
//! # Inbound (upstream → client)
//!
//! Upstream headers are relayed except `www-authenticate`, which would make
//! browsers pop a native login dialog. CORS headers are then written over the
//! result.

use std::sync::LazyLock;

use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderName};
use regex::Regex;

use crate::cors::apply_cors;

/// Matches a header name. Names are compared in lower case, which is how
/// `http::HeaderName` stores them.
#[derive(Debug, Clone)]
pub enum HeaderMatcher {
    /// Exact (lower-case) header name.
    Exact(&'static str),
    /// Regular expression tested against the header name.
    Pattern(Regex),
}

impl HeaderMatcher {
    /// Check whether `name` is selected by this matcher.
    pub fn matches(&self, name: &HeaderName) -> bool {
        match self {
            HeaderMatcher::Exact(expected) => name.as_str() == *expected,
            HeaderMatcher::Pattern(re) => re.is_match(name.as_str()),
        }
    }
}

/// Headers forwarded to upstream.
pub static OUTBOUND_ALLOW_LIST: LazyLock<Vec<HeaderMatcher>> = LazyLock::new(|| {
    vec![
        HeaderMatcher::Exact("content-type"),
        HeaderMatcher::Exact("authorization"),
        HeaderMatcher::Exact("x-goog-api-client"),
        HeaderMatcher::Exact("x-goog-api-key"),
        HeaderMatcher::Exact("accept-encoding"),
    ]
});

/// Copy every header whose name is selected by any matcher.
///
/// All values of a repeated header are kept, in order.
pub fn pick_headers(headers: &HeaderMap, matchers: &[HeaderMatcher]) -> HeaderMap {
    let mut picked = HeaderMap::new();
    for (name, value) in headers {
        if matchers.iter().any(|m| m.matches(name)) {
            picked.append(name.clone(), value.clone());
        }
    }
    picked
}

/// Whether an `authorization` value uses the `Basic` scheme.
///
/// Requires whitespace after the scheme, so `Basicfoo` is not Basic.
pub fn is_basic_auth(value: &str) -> bool {
    value
        .split_once(char::is_whitespace)
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
}

/// Build the header set sent to upstream.
pub fn sanitize_outbound(incoming: &HeaderMap) -> HeaderMap {
    let mut outbound = pick_headers(incoming, &OUTBOUND_ALLOW_LIST);

    let carries_basic = incoming
        .get_all(AUTHORIZATION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(is_basic_auth);
    if carries_basic {
        outbound.remove(AUTHORIZATION);
    }

    outbound
}

/// Build the header set returned to the client from upstream's headers.
pub fn sanitize_inbound(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    headers.remove(WWW_AUTHENTICATE);
    apply_cors(&mut headers);
    headers
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn header_map(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.append(*name, HeaderValue::from_static(*value));
        }
        headers
    }

    #[test]
    fn test_exact_matcher() {
        let matcher = HeaderMatcher::Exact("content-type");
        assert!(matcher.matches(&HeaderName::from_static("content-type")));
        assert!(!matcher.matches(&HeaderName::from_static("content-length")));
    }

    #[test]
    fn test_pattern_matcher() {
        let matcher = HeaderMatcher::Pattern(Regex::new("^x-goog-").unwrap());
        assert!(matcher.matches(&HeaderName::from_static("x-goog-api-key")));
        assert!(matcher.matches(&HeaderName::from_static("x-goog-user-project")));
        assert!(!matcher.matches(&HeaderName::from_static("x-google")));
    }

    #[test]
    fn test_pick_headers_keeps_repeated_values() {
        let incoming = header_map(&[
            ("accept-encoding", "gzip"),
            ("accept-encoding", "br"),
            ("cookie", "a=b"),
        ]);

        let picked = pick_headers(&incoming, &OUTBOUND_ALLOW_LIST);

        let values: Vec<_> = picked.get_all("accept-encoding").iter().collect();
        assert_eq!(values, vec!["gzip", "br"]);
        assert!(picked.get("cookie").is_none());
    }

    #[test]
    fn test_sanitize_outbound_allow_list() {
        let incoming = header_map(&[
            ("content-type", "application/json"),
            ("authorization", "Bearer ya29.token"),
            ("x-goog-api-client", "genai-js/0.1"),
            ("x-goog-api-key", "AIza"),
            ("accept-encoding", "gzip"),
            ("host", "proxy.example.com"),
            ("cookie", "session=1"),
            ("x-proxy-token", "secret"),
            ("x-forwarded-for", "1.2.3.4"),
            ("user-agent", "curl/8"),
        ]);

        let outbound = sanitize_outbound(&incoming);

        assert_eq!(outbound.len(), 5);
        assert_eq!(outbound["authorization"], "Bearer ya29.token");
        for name in ["host", "cookie", "x-proxy-token", "x-forwarded-for", "user-agent"] {
            assert!(outbound.get(name).is_none(), "{name} must not be forwarded");
        }
    }

    #[test]
    fn test_sanitize_outbound_drops_basic_auth() {
        let incoming = header_map(&[
            ("authorization", "Basic OnNlY3JldA=="),
            ("content-type", "application/json"),
        ]);

        let outbound = sanitize_outbound(&incoming);

        assert!(outbound.get("authorization").is_none());
        assert_eq!(outbound["content-type"], "application/json");
    }

    #[test]
    fn test_sanitize_outbound_basic_case_insensitive() {
        let incoming = header_map(&[("authorization", "bAsIc OnNlY3JldA==")]);
        assert!(sanitize_outbound(&incoming).get("authorization").is_none());
    }

    #[test]
    fn test_is_basic_auth() {
        assert!(is_basic_auth("Basic abc"));
        assert!(is_basic_auth("basic\tabc"));
        assert!(!is_basic_auth("Basicabc"));
        assert!(!is_basic_auth("Basic"));
        assert!(!is_basic_auth("Bearer abc"));
        assert!(!is_basic_auth(""));
    }

    #[test]
    fn test_sanitize_inbound_strips_www_authenticate() {
        let upstream = header_map(&[
            ("www-authenticate", "Basic realm=\"google\""),
            ("www-authenticate", "Bearer"),
            ("content-type", "application/json"),
        ]);

        let headers = sanitize_inbound(&upstream);

        assert!(headers.get("www-authenticate").is_none());
        assert_eq!(headers["content-type"], "application/json");
        assert_eq!(headers["access-control-allow-origin"], "*");
    }

    #[test]
    fn test_sanitize_inbound_cors_wins() {
        let upstream = header_map(&[
            ("access-control-allow-origin", "https://aistudio.google.com"),
            ("access-control-allow-methods", "GET"),
        ]);

        let headers = sanitize_inbound(&upstream);

        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "*");
        assert_eq!(headers["access-control-allow-headers"], "*");
    }
}
