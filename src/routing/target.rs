//! Target resolution.
//!
//! # Responsibilities
//! - Join the configured backend base with the inbound path remainder
//! - Refuse loopback backends in production before any I/O
//! - Refuse `.`/`..` segments so the URL stays under `<base>/api/`
//!
//! # Design Decisions
//! - Pure function of (config snapshot, inbound URI); no environment reads
//! - The path remainder is used verbatim, still percent-encoded
//! - One `ProxyTarget` per request, immutable once built

use std::net::IpAddr;

use axum::http::Uri;
use url::{Host, Url};

use crate::config::BackendConfig;
use crate::proxy::error::ProxyError;

/// The backend endpoint one request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    base: String,
    path: String,
    url: String,
}

impl ProxyTarget {
    /// Resolve `<base>/api/<path>[?query]`.
    ///
    /// Fails with [`ProxyError::Misconfiguration`] when the deployment is
    /// production and the base points at a loopback host, and with
    /// [`ProxyError::InvalidPath`] when `path` has a dot segment.
    pub fn resolve(backend: &BackendConfig, path: &str, query: Option<&str>) -> Result<Self, ProxyError> {
        let base = backend.base();

        if backend.is_production() && is_loopback(base) {
            return Err(ProxyError::Misconfiguration {
                backend_base: base.to_string(),
                environment: backend.environment.clone(),
            });
        }

        let path = path.trim_start_matches('/');
        if has_dot_segment(path) {
            return Err(ProxyError::InvalidPath {
                path: path.to_string(),
                backend_base: base.to_string(),
                environment: backend.environment.clone(),
            });
        }

        let mut url = format!("{base}/api/{path}");
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        Ok(Self {
            base: base.to_string(),
            path: path.to_string(),
            url,
        })
    }

    /// Resolve from a full inbound URI mounted under `mount_path`.
    pub fn from_uri(backend: &BackendConfig, mount_path: &str, uri: &Uri) -> Result<Self, ProxyError> {
        let remainder = uri.path().strip_prefix(mount_path).unwrap_or_default();
        Self::resolve(backend, remainder, uri.query())
    }

    /// The full target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The configured base the URL was built from.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The joined path segments after `/api/`.
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// True when any segment of `path` is `.` or `..`, in any spelling the
/// outbound URL parser would normalize (`%2e`, `%2E`, `\` as separator).
fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
        decoded == "." || decoded == ".."
    })
}

/// True when `base` addresses the local machine.
pub fn is_loopback(base: &str) -> bool {
    let mentions_loopback = || base.contains("localhost") || base.contains("127.0.0.1");
    let Ok(url) = Url::parse(base) else {
        return mentions_loopback();
    };
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
        Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
        None => mentions_loopback(),
    }
}
