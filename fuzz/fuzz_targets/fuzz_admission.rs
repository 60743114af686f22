//! Fuzz testing for the admission and query parsing functions.
//!
//! All of these run on attacker-controlled input before any check has
//! passed, so they must never panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_admission -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `IpRule::parse` / `is_allowed` / `ip_in_cidr`: allow-list rules and client IPs
//! - `strip_reserved_params`: raw query rewriting
//! - `is_basic_auth` and `extract_token`: credential parsing, including Basic
//!   payloads that are not valid base64 or UTF-8

#![no_main]

use axum::body::Body;
use axum::http::Request;
use libfuzzer_sys::fuzz_target;
use palm_proxy::allowlist::{IpRule, ip_in_cidr, is_allowed, parse_rules};
use palm_proxy::headers::is_basic_auth;
use palm_proxy::middleware::extract_token;
use palm_proxy::upstream::strip_reserved_params;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Split the input into a rule list and a candidate address
    let (rules_raw, ip) = s.split_once('|').unwrap_or((s, s));

    let rules = parse_rules(rules_raw);
    let _ = is_allowed(ip, &rules);
    let _ = IpRule::parse(rules_raw).to_string();
    let _ = ip_in_cidr(ip, rules_raw);

    if let Some(rewritten) = strip_reserved_params(s) {
        assert!(!rewritten.is_empty());
    }

    let _ = is_basic_auth(s);

    // Header values must be visible ASCII; skip inputs the builder rejects
    if let Ok(req) = Request::builder()
        .uri("/")
        .header("authorization", format!("Basic {s}"))
        .body(Body::empty())
    {
        let _ = extract_token(&req);
    }
    if let Ok(req) = Request::builder()
        .uri(format!("/?{s}"))
        .body(Body::empty())
    {
        let _ = extract_token(&req);
    }
});
