//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (applied in order)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← span with method, path, request_id (never the query)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← adopts or generates X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Preflight     │ ← 200 + CORS for every OPTIONS
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │    Settings      │ ← PROXY_* read from the environment
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← 401 if PROXY_TOKEN set and not matched
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │  IP Allow-List   │ ← 403 if PROXY_ALLOW_IPS set and not matched
//! └────────┬─────────┘
//!          ▼
//!    Proxy handler     ← index at `/`, otherwise forward upstream
//! ```
//!
//! There are no routes: every path and method reaches the fallback handler.

use axum::Router;
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};

use crate::handlers;
use crate::middleware::{
    IpAllowListLayer, PreflightLayer, RequestIdLayer, ResolveSettingsLayer, TokenAuthLayer,
};
use crate::state::AppState;

/// Build the application router with the full admission pipeline.
///
/// Admission settings are not inspected here: they are resolved per request,
/// so the same router serves with or without a token or allow-list.
pub fn build_router(state: AppState) -> Router {
    info!(
        upstream = %state.upstream.base_url(),
        "Forwarding all requests upstream"
    );

    let settings_layer = ResolveSettingsLayer::new(state.env.clone());

    // Applied bottom to top: the last layer added runs first.
    Router::new()
        .fallback(handlers::proxy)
        // Bodies are streamed through, never buffered by an extractor
        .layer(DefaultBodyLimit::disable())
        .layer(IpAllowListLayer::new())
        .layer(TokenAuthLayer::new())
        .layer(settings_layer)
        .layer(PreflightLayer::new())
        .layer(RequestIdLayer::new())
        .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
            info_span!(
                "request",
                method = %req.method(),
                path = %req.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
