//! Proxy failure model and the uniform error envelope.
//!
//! Only two failures originate in the gateway itself. Everything the backend
//! returns, including its own 4xx/5xx, is relayed and never passes through here.
//!
//! ```text
//! Misconfiguration → 500 {success:false, message, debug:{backendBase, environment}}
//! InvalidPath      → 400 {success:false, message, debug:{backendBase, environment}}
//! Forward          → 502 {success:false, message, target, debug:{backendBase, environment, rawError}}
//! ```

use std::error::Error as StdError;

use axum::{
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::security::headers::{apply_no_cache, X_PROXY_BACKEND_BASE, X_PROXY_ERROR, X_PROXY_TARGET};

pub const MISCONFIGURATION_MESSAGE: &str =
    "BACKEND_URL must be set to a public URL in production; refusing to proxy to a loopback address";

/// Failures raised while proxying a request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Production deployment whose backend base points at loopback.
    #[error("{}", MISCONFIGURATION_MESSAGE)]
    Misconfiguration {
        backend_base: String,
        environment: String,
    },

    /// Path remainder contains a `.` or `..` segment, which would let the
    /// resolved URL escape the backend's `/api/` namespace.
    #[error("request path `{path}` contains a dot segment")]
    InvalidPath {
        path: String,
        backend_base: String,
        environment: String,
    },

    /// The outbound call failed before a complete response was received.
    #[error("{source}")]
    Forward {
        target: String,
        backend_base: String,
        environment: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Misconfiguration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            ProxyError::Forward { .. } => StatusCode::BAD_GATEWAY,
        }
    }

    /// Label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ProxyError::Misconfiguration { .. } => "misconfigured",
            ProxyError::InvalidPath { .. } => "invalid_path",
            ProxyError::Forward { .. } => "forward_error",
        }
    }

    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            ProxyError::Misconfiguration {
                backend_base,
                environment,
            }
            | ProxyError::InvalidPath {
                backend_base,
                environment,
                ..
            } => ErrorEnvelope {
                success: false,
                message: self.to_string(),
                target: None,
                debug: Some(EnvelopeDebug {
                    backend_base: backend_base.clone(),
                    environment: environment.clone(),
                    raw_error: None,
                }),
            },
            ProxyError::Forward {
                target,
                backend_base,
                environment,
                source,
            } => ErrorEnvelope {
                success: false,
                message: self.to_string(),
                target: Some(target.clone()),
                debug: Some(EnvelopeDebug {
                    backend_base: backend_base.clone(),
                    environment: environment.clone(),
                    raw_error: Some(error_chain(source)),
                }),
            },
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let envelope = self.to_envelope();

        let mut headers = HeaderMap::new();
        apply_no_cache(&mut headers);
        let backend_base = match &self {
            ProxyError::Misconfiguration { backend_base, .. }
            | ProxyError::InvalidPath { backend_base, .. } => backend_base,
            ProxyError::Forward {
                target,
                backend_base,
                ..
            } => {
                insert_lossy(&mut headers, X_PROXY_TARGET, target);
                insert_lossy(&mut headers, X_PROXY_ERROR, &envelope.message);
                backend_base
            }
        };
        insert_lossy(&mut headers, X_PROXY_BACKEND_BASE, backend_base);

        (status, headers, Json(envelope)).into_response()
    }
}

/// Uniform body for gateway-originated failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<EnvelopeDebug>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeDebug {
    pub backend_base: String,
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_error: Option<String>,
}

/// Render an error and all of its sources, outermost first.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(cause) = current {
        parts.push(cause.to_string());
        current = cause.source();
    }
    parts.join(": ")
}

/// Header values must be visible ASCII; anything else is replaced.
fn insert_lossy(headers: &mut HeaderMap, name: &'static str, value: &str) {
    let sanitized: String = value
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .collect();
    if let Ok(value) = HeaderValue::from_str(&sanitized) {
        headers.insert(name, value);
    }
}
