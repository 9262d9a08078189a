//! Response rewriting.
//!
//! # Responsibilities
//! - Decode the backend body (JSON re-serialized, everything else verbatim)
//! - Drop headers the re-serialized body makes stale
//! - Add diagnostic and no-store headers
//! - Keep the backend's status code
//!
//! A backend that labels its body JSON but sends something else still gets
//! a response: the body becomes `null`.

use axum::{
    body::{Body, Bytes},
    http::{Method, StatusCode},
    response::Response,
};
use serde_json::Value;

use crate::proxy::forwarder::ProxyResponse;
use crate::routing::ProxyTarget;
use crate::security::headers::{apply_diagnostics, apply_no_cache, relay_response_headers};

/// Backend body after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// JSON content type; `None` when the payload did not parse.
    Json(Option<Value>),
    Text(Bytes),
}

impl DecodedBody {
    pub fn decode(content_type: Option<&str>, body: Bytes) -> Self {
        if is_json(content_type) {
            DecodedBody::Json(serde_json::from_slice(&body).ok())
        } else {
            DecodedBody::Text(body)
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            DecodedBody::Json(Some(value)) => match serde_json::to_vec(&value) {
                Ok(bytes) => Bytes::from(bytes),
                Err(_) => Bytes::from_static(b"null"),
            },
            DecodedBody::Json(None) => Bytes::from_static(b"null"),
            DecodedBody::Text(bytes) => bytes,
        }
    }
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| {
        let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        essence == "application/json" || essence.ends_with("+json")
    })
}

/// Statuses and methods that must not carry a body.
fn is_bodiless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
        || status.is_informational()
}

/// Turn the backend's reply into the response sent to the caller.
pub fn rewrite(upstream: ProxyResponse, target: &ProxyTarget, method: &Method) -> Response {
    let content_type = upstream.content_type().map(str::to_owned);
    let ProxyResponse {
        status,
        headers: upstream_headers,
        body,
    } = upstream;

    let body = if is_bodiless(method, status) {
        Bytes::new()
    } else {
        let decoded = DecodedBody::decode(content_type.as_deref(), body);
        if let DecodedBody::Json(None) = decoded {
            tracing::warn!(target_url = %target.url(), status = %status, "Backend sent invalid JSON, relaying null");
        }
        decoded.into_bytes()
    };

    let mut headers = relay_response_headers(&upstream_headers);
    apply_diagnostics(&mut headers, target.url(), target.base());
    apply_no_cache(&mut headers);

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
