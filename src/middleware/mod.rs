//! HTTP middleware for admission control and observability.
//!
//! - **Request ID**: adoption or generation of a correlation ID
//! - **Preflight**: local answer for every CORS `OPTIONS` request
//! - **Settings**: per-request resolution of the admission settings
//! - **Token Authentication**: shared secret, constant-time comparison
//! - **IP Allow-List**: exact IPv4 and CIDR rules on forwarding headers
//!
//! # Architecture
//!
//! ```text
//! Request → Trace → Request ID → Preflight → Settings → Auth → IP → Handler
//!                                    ↓                    ↓      ↓
//!                              200 + CORS          401 + CORS  403 + CORS
//! ```
//!
//! The handler then serves the index (`GET /`) or forwards upstream.
//!
//! # Security Considerations
//!
//! - Token comparison uses constant-time equality
//! - IP checks trust edge-platform headers; see [`ip`] for the spoofing caveat
//! - Every locally generated response carries the CORS headers, so browser
//!   clients can read rejections

pub mod auth;
pub mod ip;
pub mod preflight;
pub mod request_id;
pub mod settings;

pub use auth::{ExtractedToken, TokenAuthLayer, TokenSource, extract_token};
pub use ip::{CLIENT_IP_HEADERS, IpAllowListLayer, resolve_client_ip};
pub use preflight::PreflightLayer;
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestIdExt, RequestIdLayer};
pub use settings::ResolveSettingsLayer;
