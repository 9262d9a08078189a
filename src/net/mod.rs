//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly in `main`; this module only
//! covers the optional TLS termination in front of the HTTP layer.

pub mod tls;

pub use tls::load_tls_config;
