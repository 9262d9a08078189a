//! Configuration validation.
//!
//! Semantic checks on top of what serde enforces. Every problem is reported,
//! not just the first. A loopback backend in production passes validation;
//! the gateway starts and answers each proxied request with a
//! misconfiguration envelope.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.max_in_flight must be greater than zero")]
    MaxInFlight,

    #[error("listener.tls requires non-empty cert_path and key_path")]
    TlsPaths,

    #[error("backend.base_url `{url}` is invalid: {reason}")]
    BackendUrl { url: String, reason: String },

    #[error("proxy.mount_path `{0}` must start with `/`, not be `/` and not end with `/`")]
    MountPath(String),

    #[error("timeouts.connect_secs must be greater than zero")]
    ConnectTimeout,

    #[error("timeouts.upstream_secs must be greater than zero when set")]
    UpstreamTimeout,

    #[error("security.max_body_size must be greater than zero")]
    MaxBodySize,

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Validate a configuration, collecting all errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_in_flight == 0 {
        errors.push(ValidationError::MaxInFlight);
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() || tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPaths);
        }
    }

    if let Err(reason) = check_backend_url(config.backend.base()) {
        errors.push(ValidationError::BackendUrl {
            url: config.backend.base_url.clone(),
            reason,
        });
    }

    let mount = &config.proxy.mount_path;
    if !mount.starts_with('/') || mount.len() < 2 || mount.ends_with('/') {
        errors.push(ValidationError::MountPath(mount.clone()));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ConnectTimeout);
    }
    if config.timeouts.upstream_secs == Some(0) {
        errors.push(ValidationError::UpstreamTimeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::MaxBodySize);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend_url(base: &str) -> Result<(), String> {
    let url = Url::parse(base).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("unsupported scheme `{other}`")),
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err("missing host".to_string());
    }
    Ok(())
}
