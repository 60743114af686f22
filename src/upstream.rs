//! Forwarding to the upstream API.
//!
//! # Request Mapping
//!
//! ```text
//! inbound:   POST /v1beta/models/gemini:generateContent?_path=x&key=AIza&alt=sse
//! upstream:  POST https://generativelanguage.googleapis.com/v1beta/models/gemini:generateContent?key=AIza&alt=sse
//! ```
//!
//! - The inbound path replaces the base URL's path
//! - `_path` is reserved for routing and always removed from the query
//! - Every other query segment is forwarded verbatim, in order
//! - Headers go through [`sanitize_outbound`]
//!
//! # Streaming
//!
//! Neither body is buffered. The inbound body is wrapped as a
//! `reqwest::Body` stream and the upstream response body is handed back to
//! hyper as a stream, so uploads and server-sent events of any size pass
//! through with bounded memory. When the client goes away hyper drops the
//! response body, which drops the upstream response with it.

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, HttpBody};
use axum::http::{Request, Response, Uri};
use tracing::{debug, warn};
use url::Url;
use url::form_urlencoded;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::headers::{sanitize_inbound, sanitize_outbound};
use crate::metrics;

/// Query parameter reserved for routing; never forwarded.
pub const RESERVED_PATH_PARAM: &str = "_path";

/// HTTP client bound to a single upstream origin.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Arc<Url>,
}

impl UpstreamClient {
    /// Create a client for the upstream configured in `config`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if the upstream URL is invalid, or
    /// `AppError::Upstream` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let base_url = config.upstream_url()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.upstream_connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::new(base_url),
        })
    }

    /// The upstream origin.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Map an inbound request URI onto the upstream origin.
    pub fn target_url(&self, uri: &Uri) -> Url {
        let mut url = (*self.base_url).clone();
        url.set_path(uri.path());
        url.set_fragment(None);
        url.set_query(uri.query().and_then(strip_reserved_params).as_deref());
        url
    }

    /// Forward `req` upstream and relay the response.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Upstream` on transport failure (DNS, connect,
    /// timeout). Upstream error statuses are not errors; they are relayed.
    pub async fn forward(&self, req: Request<Body>) -> AppResult<Response<Body>> {
        let (parts, body) = req.into_parts();
        let url = self.target_url(&parts.uri);
        let headers = sanitize_outbound(&parts.headers);

        debug!(
            method = %parts.method,
            path = %url.path(),
            forwarded_headers = headers.len(),
            "Forwarding request upstream"
        );

        let mut builder = self
            .client
            .request(parts.method.clone(), url)
            .headers(headers);
        if !body.is_end_stream() {
            builder = builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let started = Instant::now();
        let upstream = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                metrics::record_upstream_error(&e);
                warn!(method = %parts.method, error = %e, "Upstream request failed");
                return Err(AppError::Upstream(e));
            }
        };

        let status = upstream.status();
        metrics::record_upstream_duration(status.as_u16(), started.elapsed().as_secs_f64());
        debug!(status = %status, "Upstream responded");

        let headers = sanitize_inbound(upstream.headers());
        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}

/// Drop every `_path` segment from a raw query string.
///
/// Remaining segments are kept byte-for-byte, in order, duplicates included.
/// Returns `None` when nothing is left.
pub fn strip_reserved_params(query: &str) -> Option<String> {
    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| !is_reserved_segment(segment))
        .collect();

    if kept.is_empty() {
        None
    } else {
        Some(kept.join("&"))
    }
}

fn is_reserved_segment(segment: &str) -> bool {
    form_urlencoded::parse(segment.as_bytes())
        .next()
        .is_some_and(|(key, _)| key == RESERVED_PATH_PARAM)
}
