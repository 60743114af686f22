//! Terminal handler: index page or upstream forwarding.
//!
//! By the time a request reaches this handler it has passed preflight, token
//! authentication and the IP allow-list.
//!
//! # Index
//!
//! `/` (any method) answers `200 success` locally unless `PROXY_SHOW_INDEX`
//! is set to `0`, `false`, `off` or `no`, in which case it is forwarded like
//! every other path.

use std::sync::Arc;

use axum::Extension;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::instrument;

use crate::cors::cors_response;
use crate::metrics::{self, outcome};
use crate::settings::ProxySettings;
use crate::state::AppState;

/// Body of the index response.
pub const INDEX_BODY: &str = "success";

/// Fallback handler for every path.
#[instrument(skip_all)]
pub async fn proxy(
    State(state): State<AppState>,
    Extension(settings): Extension<Arc<ProxySettings>>,
    req: Request,
) -> Response {
    if settings.show_index && req.uri().path() == "/" {
        return index_response();
    }

    match state.upstream.forward(req).await {
        Ok(response) => {
            metrics::record_request(outcome::FORWARDED);
            response
        }
        Err(e) => {
            metrics::record_request(outcome::UPSTREAM_ERROR);
            e.into_response()
        }
    }
}

/// Build the index (200) response.
pub fn index_response() -> Response {
    metrics::record_request(outcome::INDEX);

    let mut response = cors_response(StatusCode::OK, Body::from(INDEX_BODY));
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
