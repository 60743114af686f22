//! Permissive CORS headers.
//!
//! Every response the proxy produces, whether generated locally or relayed
//! from upstream, carries the same three headers so browser clients can read
//! both successful responses and error statuses.

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

/// Wildcard value shared by all three headers.
static WILDCARD: HeaderValue = HeaderValue::from_static("*");

/// The CORS header set, in insertion order.
pub const CORS_HEADER_NAMES: [HeaderName; 3] = [
    ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_HEADERS,
];

/// Insert the CORS headers, replacing any existing values.
pub fn apply_cors(headers: &mut HeaderMap) {
    for name in CORS_HEADER_NAMES {
        headers.insert(name, WILDCARD.clone());
    }
}

/// A fresh header map holding only the CORS headers.
pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(CORS_HEADER_NAMES.len());
    apply_cors(&mut headers);
    headers
}

/// Build a locally generated response with CORS headers attached.
pub fn cors_response(status: StatusCode, body: Body) -> Response<Body> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = cors_headers();
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_headers_exact_set() {
        let headers = cors_headers();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-methods"], "*");
        assert_eq!(headers["access-control-allow-headers"], "*");
    }

    #[test]
    fn test_apply_cors_overrides_existing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://example.com"),
        );
        headers.append(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://other.example.com"),
        );

        apply_cors(&mut headers);

        let origins: Vec<_> = headers.get_all(ACCESS_CONTROL_ALLOW_ORIGIN).iter().collect();
        assert_eq!(origins, vec!["*"]);
    }

    #[test]
    fn test_cors_response() {
        let response = cors_response(StatusCode::FORBIDDEN, Body::from("Forbidden"));

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers().len(), 3);
    }
}
