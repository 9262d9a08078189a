//! Storefront backend gateway library.
//!
//! A single mount point that relays every storefront API call to the
//! configured backend service.
//!
//! ```text
//!     Client ──▶ http::server ──▶ proxy::Gateway ──▶ routing::target
//!                                       │
//!                                       ├─▶ proxy::body (transcode)
//!                                       ├─▶ security::headers (sanitize)
//!                                       ├─▶ proxy::forwarder ──────────────▶ Backend
//!                                       └─▶ proxy::response (rewrite) ◀────
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::Gateway;
