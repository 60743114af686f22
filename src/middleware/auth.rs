//! Shared-secret token authentication middleware.
//!
//! # Usage
//!
//! Set the `PROXY_TOKEN` environment variable to enable authentication:
//!
//! ```bash
//! PROXY_TOKEN=your-secret cargo run
//! ```
//!
//! Every request except CORS preflight must then present the same token via
//! one of (checked in this order, first present wins):
//!
//! ```bash
//! # 1. Dedicated header
//! curl -H "X-Proxy-Token: your-secret" http://localhost:8787/v1beta/models
//!
//! # 2. Authorization header, Bearer or Basic with empty username
//! curl -H "Authorization: Bearer your-secret" http://localhost:8787/v1beta/models
//! curl -u ":your-secret" http://localhost:8787/v1beta/models
//!
//! # 3. Query parameter: token, key or access_token
//! curl "http://localhost:8787/v1beta/models?token=your-secret"
//! ```
//!
//! # Challenge
//!
//! Rejections carry `WWW-Authenticate: Bearer realm="palm-proxy"`. A `Basic`
//! challenge is never sent because browsers answer it with a native login
//! dialog.
//!
//! # Security Features
//!
//! - **Constant-time comparison**: token equality does not leak timing
//! - **Fail soft extraction**: a malformed Basic payload yields no token from
//!   that source; extraction moves on to the query string

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{Engine, alphabet};
use subtle::ConstantTimeEq;
use tower::{Layer, Service};
use tracing::{debug, warn};
use url::form_urlencoded;

use super::ip::resolve_client_ip;
use super::request_id::RequestIdExt;
use crate::cors::cors_response;
use crate::error::AppError;
use crate::metrics::{self, outcome};
use crate::settings::ProxySettings;

/// Dedicated token header.
pub const PROXY_TOKEN_HEADER: &str = "x-proxy-token";

/// Query parameters accepted as token carriers, in priority order.
pub const TOKEN_QUERY_PARAMS: [&str; 3] = ["token", "key", "access_token"];

/// Realm advertised in the `WWW-Authenticate` challenge.
pub const AUTH_REALM: &str = "palm-proxy";

/// Hint header telling tools which credential is expected.
pub const AUTH_REQUIRED_HEADER: &str = "x-auth-required";

/// Standard-alphabet base64 that accepts Basic payloads with or without
/// trailing `=` padding.
const BASIC_CREDENTIALS: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Where a candidate token can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `X-Proxy-Token` header
    ProxyTokenHeader,
    /// `Authorization: Bearer <token>` or `Authorization: Basic base64(":<token>")`
    Authorization,
    /// `token`, `key` or `access_token` query parameter
    Query,
}

impl TokenSource {
    /// All sources in extraction order.
    pub const ORDERED: [TokenSource; 3] = [
        TokenSource::ProxyTokenHeader,
        TokenSource::Authorization,
        TokenSource::Query,
    ];

    /// Try to pull a token out of `req`. Never fails; anything unusable is `None`.
    pub fn extract<B>(self, req: &Request<B>) -> Option<String> {
        match self {
            TokenSource::ProxyTokenHeader => req
                .headers()
                .get(PROXY_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            TokenSource::Authorization => req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(token_from_authorization),
            TokenSource::Query => req.uri().query().and_then(token_from_query),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TokenSource::ProxyTokenHeader => "x-proxy-token",
            TokenSource::Authorization => "authorization",
            TokenSource::Query => "query",
        }
    }
}

/// A token together with the place it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Extract the first available token from `req`.
pub fn extract_token<B>(req: &Request<B>) -> Option<ExtractedToken> {
    TokenSource::ORDERED.into_iter().find_map(|source| {
        source
            .extract(req)
            .map(|token| ExtractedToken { token, source })
    })
}

/// Parse an `Authorization` header value.
///
/// - `Bearer <v>` yields the first word of `<v>` (possibly empty)
/// - `Basic <b64>` yields the password part of `user:password`, or `None` if
///   the payload does not decode or the password is empty
/// - any other scheme yields `None`
fn token_from_authorization(value: &str) -> Option<String> {
    // Only the first whitespace-delimited word after the scheme is used
    let mut words = value.split_whitespace();
    let scheme = words.next().unwrap_or_default();
    let credentials = words.next().unwrap_or_default();

    if scheme.eq_ignore_ascii_case("bearer") {
        return Some(credentials.to_string());
    }

    if scheme.eq_ignore_ascii_case("basic") {
        let decoded = BASIC_CREDENTIALS.decode(credentials).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (_username, password) = decoded.split_once(':')?;
        return (!password.is_empty()).then(|| password.to_string());
    }

    None
}

/// Look up `token`, then `key`, then `access_token` in a raw query string.
fn token_from_query(query: &str) -> Option<String> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    TOKEN_QUERY_PARAMS.iter().find_map(|param| {
        pairs
            .iter()
            .find(|(key, _)| key == param)
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
            .cloned()
    })
}

/// Perform constant-time comparison of two strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Token authentication layer.
///
/// Reads the per-request [`ProxySettings`] placed in the request extensions
/// by [`ResolveSettingsLayer`](super::ResolveSettingsLayer); when no token is
/// configured every request passes through.
#[derive(Clone, Default)]
pub struct TokenAuthLayer;

impl TokenAuthLayer {
    /// Create a new token auth layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TokenAuthLayer {
    type Service = TokenAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TokenAuthService { inner }
    }
}

/// Token authentication service wrapper.
#[derive(Clone)]
pub struct TokenAuthService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TokenAuthService<S>
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

            // If no token is configured, allow all requests
            let Some(expected) = settings.required_token.as_deref() else {
                return inner.call(req).await;
            };

            match extract_token(&req) {
                Some(extracted) if constant_time_eq(&extracted.token, expected) => {
                    debug!(source = extracted.source.as_str(), "Token authentication successful");
                    inner.call(req).await
                }
                Some(extracted) => {
                    warn!(
                        path = %req.uri().path(),
                        client_ip = resolve_client_ip(&req).unwrap_or("unknown"),
                        request_id = req.request_id().unwrap_or("-"),
                        source = extracted.source.as_str(),
                        "Invalid proxy token provided"
                    );
                    Ok(unauthorized_response())
                }
                None => {
                    warn!(
                        path = %req.uri().path(),
                        client_ip = resolve_client_ip(&req).unwrap_or("unknown"),
                        request_id = req.request_id().unwrap_or("-"),
                        "Missing proxy token"
                    );
                    Ok(unauthorized_response())
                }
            }
        })
    }
}

/// Build an unauthorized (401) response with a Bearer challenge.
pub fn unauthorized_response() -> Response<Body> {
    metrics::record_request(outcome::UNAUTHORIZED);

    let mut response = cors_response(StatusCode::UNAUTHORIZED, Body::from("Unauthorized"));
    let headers = response.headers_mut();
    if let Ok(challenge) = HeaderValue::from_str(&format!("Bearer realm=\"{AUTH_REALM}\"")) {
        headers.insert(WWW_AUTHENTICATE, challenge);
    }
    headers.insert(AUTH_REQUIRED_HEADER, HeaderValue::from_static("token"));
    response
}
