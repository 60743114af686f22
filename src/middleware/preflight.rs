//! CORS preflight short-circuit.
//!
//! Every `OPTIONS` request is answered locally with 200, an empty body and
//! exactly the three CORS headers. It runs before settings resolution, so
//! preflight never needs a token and is never subject to the IP allow-list.

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use tower::{Layer, Service};
use tracing::debug;

use crate::cors::cors_response;
use crate::metrics::{self, outcome};

/// Preflight layer.
#[derive(Clone, Default)]
pub struct PreflightLayer;

impl PreflightLayer {
    /// Create a new preflight layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for PreflightLayer {
    type Service = PreflightService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PreflightService { inner }
    }
}

/// Preflight service wrapper.
#[derive(Clone)]
pub struct PreflightService<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for PreflightService<S>
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
        if req.method() == Method::OPTIONS {
            debug!(path = %req.uri().path(), "Answering CORS preflight");
            return Box::pin(async { Ok(preflight_response()) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(req).await })
    }
}

/// Build the preflight (200) response.
pub fn preflight_response() -> Response<Body> {
    metrics::record_request(outcome::PREFLIGHT);
    cors_response(StatusCode::OK, Body::empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tower::ServiceExt;
    use tower::service_fn;

    async fn teapot(_req: Request<Body>) -> Result<Response<Body>, std::convert::Infallible> {
        let mut response = Response::new(Body::from("inner"));
        *response.status_mut() = StatusCode::IM_A_TEAPOT;
        Ok(response)
    }

    #[tokio::test]
    async fn test_options_short_circuits() {
        let svc = PreflightLayer::new().layer(service_fn(teapot));
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/v1beta/models")
            .header("x-proxy-token", "ignored")
            .body(Body::empty())
            .unwrap();

        let response = svc.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().len(), 3);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_other_methods_pass_through() {
        let svc = PreflightLayer::new().layer(service_fn(teapot));
        let req = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = svc.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
