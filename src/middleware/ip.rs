//! Client IP resolution and the IP allow-list middleware.
//!
//! # Header Priority
//!
//! The proxy runs behind an edge platform, so the client address is taken from
//! forwarding headers, first present wins:
//!
//! 1. `x-nf-client-connection-ip` (Netlify)
//! 2. `x-forwarded-for` (generic reverse proxies)
//! 3. `cf-connecting-ip` (Cloudflare)
//!
//! Each header may hold a comma-separated chain; only the first entry is used.
//!
//! # Security Warning: IP Spoofing Risk
//!
//! **These headers are client-controllable** unless the platform in front of
//! this service overwrites them. Only rely on `PROXY_ALLOW_IPS` when the
//! proxy is reachable exclusively through such a platform.
//!
//! # Fail Closed
//!
//! When the allow-list is active and no header yields an address, the request
//! is rejected with 403.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::request_id::RequestIdExt;
use crate::allowlist::is_allowed;
use crate::cors::cors_response;
use crate::error::AppError;
use crate::metrics::{self, outcome};
use crate::settings::ProxySettings;

/// Client IP headers in priority order.
pub const CLIENT_IP_HEADERS: [&str; 3] = [
    "x-nf-client-connection-ip",
    "x-forwarded-for",
    "cf-connecting-ip",
];

/// Resolve the client IP from forwarding headers.
///
/// Returns a slice pointing into the request headers, or `None` if no header
/// is present. A present but blank header is skipped.
#[inline]
pub fn resolve_client_ip<B>(req: &Request<B>) -> Option<&str> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        req.headers()
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.split(',').next().unwrap_or(v).trim())
    })
}

/// IP allow-list layer.
///
/// Active only when `PROXY_ALLOW_IPS` is set to a non-empty value.
#[derive(Clone, Default)]
pub struct IpAllowListLayer;

impl IpAllowListLayer {
    /// Create a new allow-list layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for IpAllowListLayer {
    type Service = IpAllowListService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpAllowListService { inner }
    }
}

/// IP allow-list service wrapper.
#[derive(Clone)]
pub struct IpAllowListService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for IpAllowListService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let settings = req.extensions().get::<Arc<ProxySettings>>().cloned();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(settings) = settings else {
                return Ok(AppError::Internal(
                    "proxy settings missing from request extensions".to_string(),
                )
                .into_response());
            };

            if !settings.ip_filter_enabled() {
                return inner.call(req).await;
            }

            let client_ip = resolve_client_ip(&req).map(str::to_owned);
            match client_ip {
                Some(ip) if is_allowed(&ip, &settings.allow_ip_rules) => {
                    debug!(client_ip = %ip, "Client IP allowed");
                    inner.call(req).await
                }
                Some(ip) => {
                    warn!(
                        client_ip = %ip,
                        path = %req.uri().path(),
                        request_id = req.request_id().unwrap_or("-"),
                        "Client IP not in allow-list"
                    );
                    Ok(forbidden_response())
                }
                None => {
                    warn!(
                        path = %req.uri().path(),
                        request_id = req.request_id().unwrap_or("-"),
                        "No client IP header present, rejecting"
                    );
                    Ok(forbidden_response())
                }
            }
        })
    }
}

/// Build a forbidden (403) response.
pub fn forbidden_response() -> Response<Body> {
    metrics::record_request(outcome::FORBIDDEN);
    cors_response(StatusCode::FORBIDDEN, Body::from("Forbidden"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_from_netlify_header() {
        let req = Request::builder()
            .header("x-nf-client-connection-ip", "203.0.113.7")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("203.0.113.7"));
    }

    #[test]
    fn test_resolve_netlify_priority() {
        let req = Request::builder()
            .header("cf-connecting-ip", "3.3.3.3")
            .header("x-forwarded-for", "2.2.2.2")
            .header("x-nf-client-connection-ip", "1.1.1.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("1.1.1.1"));
    }

    #[test]
    fn test_resolve_xff_priority_over_cloudflare() {
        let req = Request::builder()
            .header("cf-connecting-ip", "3.3.3.3")
            .header("x-forwarded-for", "2.2.2.2")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("2.2.2.2"));
    }

    #[test]
    fn test_resolve_xff_first_entry_trimmed() {
        let req = Request::builder()
            .header("x-forwarded-for", "  192.168.1.1  , 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("192.168.1.1"));
    }

    #[test]
    fn test_resolve_cloudflare_fallback() {
        let req = Request::builder()
            .header("cf-connecting-ip", "198.51.100.4")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("198.51.100.4"));
    }

    #[test]
    fn test_resolve_blank_header_skipped() {
        let req = Request::builder()
            .header("x-nf-client-connection-ip", "   ")
            .header("x-forwarded-for", "10.0.0.9")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("10.0.0.9"));
    }

    #[test]
    fn test_resolve_empty_first_entry() {
        // The first hop is empty; it is returned as-is and will match no rule.
        let req = Request::builder()
            .header("x-forwarded-for", ", 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some(""));
    }

    #[test]
    fn test_resolve_none() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(resolve_client_ip(&req), None);
    }

    #[test]
    fn test_resolve_ipv6_passed_through() {
        let req = Request::builder()
            .header("x-forwarded-for", "2001:db8::1, 10.0.0.1")
            .body(Body::empty())
            .unwrap();

        assert_eq!(resolve_client_ip(&req), Some("2001:db8::1"));
    }

    #[test]
    fn test_forbidden_response_shape() {
        let response = forbidden_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().len(), 3);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}
