//! Header manipulation for both directions of the proxy.
//!
//! # Responsibilities
//! - Derive outbound request headers from the caller's headers
//! - Strip framing and hop-by-hop headers the HTTP client must compute itself
//! - Force an uncompressed upstream response
//! - Diagnostic and no-store headers on everything the gateway emits
//!
//! `Authorization` and cookies are forwarded untouched; credential checks
//! belong to the backend.

use axum::http::{
    header::{self, HeaderName},
    HeaderMap, HeaderValue,
};

/// Resolved backend URL a request was forwarded to.
pub const X_PROXY_TARGET: &str = "x-proxy-target";

/// Configured backend base address.
pub const X_PROXY_BACKEND_BASE: &str = "x-proxy-backend-base";

/// Forward failure message on 502 envelopes.
pub const X_PROXY_ERROR: &str = "x-proxy-error";

pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// Connection-scoped headers never relayed in either direction.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Headers invalidated when a response body is re-serialized.
const STALE_RESPONSE: &[&str] = &["content-encoding", "transfer-encoding", "content-length"];

fn is_hop_by_hop(name: &HeaderName) -> bool {
    HOP_BY_HOP.contains(&name.as_str())
}

/// Build the outbound request headers from the caller's headers.
///
/// `Host` is dropped so the client derives it from the target URL,
/// `Content-Length` is recomputed from the transcoded body and
/// `Accept-Encoding` is pinned to `identity`.
pub fn sanitize_request_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if *name == header::HOST || *name == header::CONTENT_LENGTH || is_hop_by_hop(name) {
            continue;
        }
        outbound.append(name.clone(), value.clone());
    }
    outbound.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    outbound
}

/// Copy backend response headers, dropping ones the re-serialized body
/// would make stale. Repeated headers such as `Set-Cookie` are kept.
pub fn relay_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len() + 6);
    for (name, value) in upstream {
        if STALE_RESPONSE.contains(&name.as_str()) || is_hop_by_hop(name) {
            continue;
        }
        relayed.append(name.clone(), value.clone());
    }
    relayed
}

/// Force the no-store triad, replacing whatever the backend sent.
pub fn apply_no_cache(headers: &mut HeaderMap) {
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

/// Diagnostic headers readable from browser JavaScript.
pub fn apply_diagnostics(headers: &mut HeaderMap, target: &str, backend_base: &str) {
    headers.insert(
        header::ACCESS_CONTROL_EXPOSE_HEADERS,
        HeaderValue::from_static("*"),
    );
    if let Ok(value) = HeaderValue::from_str(target) {
        headers.insert(X_PROXY_TARGET, value);
    }
    if let Ok(value) = HeaderValue::from_str(backend_base) {
        headers.insert(X_PROXY_BACKEND_BASE, value);
    }
}
