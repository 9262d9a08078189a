//! Environment overlay.
//!
//! The backend location and deployment environment can be supplied by the
//! process environment, which takes precedence over the config file:
//!
//! | Setting | Sources, highest first |
//! |---|---|
//! | backend base | `BACKEND_URL`, `NEXT_PUBLIC_BACKEND_URL`, file, default |
//! | environment | `APP_ENV`, `NODE_ENV`, file, `development` |
//!
//! Empty variables count as unset. The overlay runs once at startup; nothing
//! reads the environment on the request path.

use crate::config::schema::ProxyConfig;

pub const BACKEND_URL: &str = "BACKEND_URL";
pub const NEXT_PUBLIC_BACKEND_URL: &str = "NEXT_PUBLIC_BACKEND_URL";
pub const APP_ENV: &str = "APP_ENV";
pub const NODE_ENV: &str = "NODE_ENV";

/// Apply environment overrides using the given variable lookup.
pub fn apply_overrides<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = non_empty(BACKEND_URL).or_else(|| non_empty(NEXT_PUBLIC_BACKEND_URL)) {
        config.backend.base_url = url.trim().to_string();
    }

    if let Some(env) = non_empty(APP_ENV).or_else(|| non_empty(NODE_ENV)) {
        config.backend.environment = env.trim().to_string();
    }
}
