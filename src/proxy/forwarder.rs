//! Outbound HTTP client.
//!
//! Exactly one attempt per inbound request. Redirects are returned to the
//! caller instead of being followed.

use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, StatusCode},
};

use crate::config::{BackendConfig, TimeoutConfig};
use crate::proxy::body::OutboundBody;
use crate::proxy::error::ProxyError;
use crate::routing::ProxyTarget;

/// What the backend answered, fully buffered.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// Issues the single outbound call for each proxied request.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(secs) = timeouts.upstream_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Send the request and buffer the backend's reply.
    ///
    /// Any failure before the full body arrives (DNS, refused connection,
    /// timeout, reset mid-body) is a [`ProxyError::Forward`].
    pub async fn forward(
        &self,
        backend: &BackendConfig,
        target: &ProxyTarget,
        method: Method,
        mut headers: HeaderMap,
        body: OutboundBody,
    ) -> Result<ProxyResponse, ProxyError> {
        let forward_error = |source: reqwest::Error| ProxyError::Forward {
            target: target.url().to_string(),
            backend_base: target.base().to_string(),
            environment: backend.environment.clone(),
            source,
        };

        body.prepare_headers(&mut headers);
        let request = self
            .client
            .request(method, target.url())
            .headers(headers);
        let response = body.attach(request).send().await.map_err(forward_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(forward_error)?;

        Ok(ProxyResponse {
            status,
            headers,
            body,
        })
    }
}
