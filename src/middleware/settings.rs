//! Per-request settings resolution.
//!
//! Admission settings are read from the environment on every request and
//! attached to the request as an `Arc<ProxySettings>` extension, so changes to
//! `PROXY_TOKEN`, `PROXY_ALLOW_IPS` or `PROXY_SHOW_INDEX` apply without a
//! restart. Downstream layers and the handler read the extension instead of
//! the environment.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use tower::{Layer, Service};

use crate::env::EnvironmentReader;
use crate::settings::ProxySettings;

/// Layer that resolves [`ProxySettings`] for each request.
#[derive(Clone)]
pub struct ResolveSettingsLayer {
    env: Arc<dyn EnvironmentReader>,
}

impl ResolveSettingsLayer {
    /// Create a layer reading from `env`.
    pub fn new(env: Arc<dyn EnvironmentReader>) -> Self {
        Self { env }
    }
}

impl<S> Layer<S> for ResolveSettingsLayer {
    type Service = ResolveSettingsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ResolveSettingsService {
            inner,
            env: Arc::clone(&self.env),
        }
    }
}

/// Settings resolution service wrapper.
#[derive(Clone)]
pub struct ResolveSettingsService<S> {
    inner: S,
    env: Arc<dyn EnvironmentReader>,
}

impl<S> Service<Request<Body>> for ResolveSettingsService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let settings = ProxySettings::resolve(self.env.as_ref());
        req.extensions_mut().insert(Arc::new(settings));
        self.inner.call(req)
    }
}
