//! Gateway configuration types.
//!
//! Every section is optional in the TOML file; missing sections and keys
//! fall back to the `Default` impls below.

use serde::{Deserialize, Serialize};

/// Backend base used when neither the config file nor the environment names one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5001";

/// Environment name that enables the loopback guard.
pub const PRODUCTION: &str = "production";

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Where the gateway accepts traffic.
    pub listener: ListenerConfig,

    /// Where requests are forwarded to.
    pub backend: BackendConfig,

    /// Inbound route settings.
    pub proxy: RouteConfig,

    /// Outbound call timeouts.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Inbound socket settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Socket address to bind, `host:port`.
    pub bind_address: String,

    /// Terminate TLS when present.
    pub tls: Option<TlsConfig>,

    /// Maximum proxied requests being relayed at once. Requests beyond this
    /// are answered with 503; open connections are not counted.
    #[serde(alias = "max_connections")]
    pub max_in_flight: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_in_flight: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Backend service location and the deployment it runs in.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base address of the backend (scheme, host, optional port).
    /// Overridden by `BACKEND_URL` / `NEXT_PUBLIC_BACKEND_URL`.
    pub base_url: String,

    /// Deployment environment name. Overridden by `APP_ENV` / `NODE_ENV`.
    pub environment: String,
}

impl BackendConfig {
    /// The base address without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// True when running in a production deployment.
    pub fn is_production(&self) -> bool {
        self.environment.trim().eq_ignore_ascii_case(PRODUCTION)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Inbound route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Path prefix the gateway is mounted under; the remainder is forwarded
    /// to `<base>/api/<remainder>`.
    pub mount_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            mount_path: "/api/backend".to_string(),
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds (includes DNS).
    pub connect_secs: u64,

    /// Total upstream timeout in seconds. Unset means the gateway waits for
    /// the backend as long as the client stays connected.
    pub upstream_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            upstream_secs: None,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 25 * 1024 * 1024, // 25MB, product image uploads
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_toml_uses_defaults() {
        let config: ProxyConfig = toml::from_str("[backend]\nbase_url = \"https://api.shop.test/\"\n").unwrap();
        assert_eq!(config.backend.base(), "https://api.shop.test");
        assert_eq!(config.backend.environment, "development");
        assert_eq!(config.proxy.mount_path, "/api/backend");
        assert_eq!(config.timeouts.upstream_secs, None);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn in_flight_limit_accepts_old_key() {
        let config: ProxyConfig = toml::from_str("[listener]\nmax_in_flight = 64\n").unwrap();
        assert_eq!(config.listener.max_in_flight, 64);

        let config: ProxyConfig = toml::from_str("[listener]\nmax_connections = 32\n").unwrap();
        assert_eq!(config.listener.max_in_flight, 32);
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let mut backend = BackendConfig::default();
        assert!(!backend.is_production());
        backend.environment = "Production".into();
        assert!(backend.is_production());
    }
}
