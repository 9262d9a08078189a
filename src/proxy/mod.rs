//! Backend proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → routing::target (resolve, fail fast on loopback-in-production or dot segments)
//!     → body.rs (classify + transcode body)
//!     → security::headers (sanitize)
//!     → forwarder.rs (one outbound call, manual redirects)
//!     → response.rs (decode, header hygiene, diagnostics)
//!     → Caller
//!
//! On failure:
//!     → error.rs (uniform JSON envelope, 400, 500 or 502)
//! ```
//!
//! # Design Decisions
//! - Stateless per request; only the immutable config is shared
//! - Every failure becomes a response, nothing escapes to the runtime
//! - No retries, no backoff

pub mod body;
pub mod error;
pub mod forwarder;
pub mod response;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};

use crate::config::ProxyConfig;
use crate::observability::metrics;
use crate::routing::ProxyTarget;
use crate::security::headers::sanitize_request_headers;

pub use body::{BodyEncoding, OutboundBody};
pub use error::{ErrorEnvelope, ProxyError};
pub use forwarder::{Forwarder, ProxyResponse};

/// The request relay: config snapshot plus outbound client.
#[derive(Clone)]
pub struct Gateway {
    config: Arc<ProxyConfig>,
    forwarder: Forwarder,
}

impl Gateway {
    pub fn new(config: Arc<ProxyConfig>) -> Result<Self, reqwest::Error> {
        let forwarder = Forwarder::new(&config.timeouts)?;
        Ok(Self { config, forwarder })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Relay one request. Always produces a response.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();

        let (response, outcome) = match self.relay(request).await {
            Ok(response) => (response, "relayed"),
            Err(err) => {
                let outcome = err.outcome();
                match &err {
                    ProxyError::Misconfiguration { backend_base, environment } => {
                        tracing::error!(
                            backend_base = %backend_base,
                            environment = %environment,
                            "Refusing to proxy to a loopback backend in production"
                        );
                    }
                    ProxyError::InvalidPath { path, .. } => {
                        tracing::warn!(path = %path, "Rejecting request path with dot segments");
                    }
                    ProxyError::Forward { target, source, .. } => {
                        tracing::error!(target_url = %target, error = %source, "Upstream request failed");
                    }
                }
                (err.into_response(), outcome)
            }
        };

        metrics::record_request(method.as_str(), response.status().as_u16(), outcome, start);
        response
    }

    async fn relay(&self, request: Request<Body>) -> Result<Response, ProxyError> {
        let target = ProxyTarget::from_uri(&self.config.backend, &self.config.proxy.mount_path, request.uri())?;
        let method = request.method().clone();
        let headers = sanitize_request_headers(request.headers());

        let (encoding, body) = body::transcode(request, self.config.security.max_body_size).await;

        tracing::debug!(
            method = %method,
            target_url = %target.url(),
            encoding = encoding.as_str(),
            "Forwarding request"
        );

        let start = Instant::now();
        let upstream = self
            .forwarder
            .forward(&self.config.backend, &target, method.clone(), headers, body)
            .await?;

        tracing::info!(
            method = %method,
            target_url = %target.url(),
            status = upstream.status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Relayed backend response"
        );

        Ok(response::rewrite(upstream, &target, &method))
    }
}
