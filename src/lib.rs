//! # PaLM Proxy
//!
//! A small reverse proxy in front of Google's generative language API, for
//! browser and tool clients that cannot reach the API directly:
//!
//! - **Forwarding**: path and query relayed to a fixed upstream origin, bodies
//!   streamed both ways
//! - **CORS**: permissive headers on every response, preflight answered locally
//! - **Admission**: optional shared-secret token and IPv4 allow-list, both
//!   re-read from the environment on every request
//! - **Header hygiene**: outbound allow-list, Basic credentials and upstream
//!   `WWW-Authenticate` challenges stripped
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Trace → Request ID → Preflight → Settings      │
//! │              → Token Auth → IP Allow-List)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Proxy handler (index or forward)                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  UpstreamClient (reqwest, streaming)                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  generativelanguage.googleapis.com                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use palm_proxy::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr = config.server_addr();
//!     let app = build_router(AppState::new(config)?);
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! Require a token:
//! ```bash
//! PROXY_TOKEN=your-secret cargo run
//! ```
//!
//! Restrict client addresses:
//! ```bash
//! PROXY_ALLOW_IPS="203.0.113.7, 10.0.0.0/8" cargo run
//! ```

pub mod allowlist;
pub mod config;
pub mod cors;
pub mod env;
pub mod error;
pub mod handlers;
pub mod headers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod settings;
pub mod state;
pub mod upstream;
pub mod utils;

// Re-exports for convenience
pub use config::{Config, LogFormat};
pub use env::{EnvironmentReader, ProcessEnv, StaticEnv};
pub use error::{AppError, AppResult};
pub use routes::build_router;
pub use settings::ProxySettings;
pub use state::AppState;
pub use upstream::UpstreamClient;
