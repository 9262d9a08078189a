//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound URI (/api/backend/<path>?<query>)
//!     → target.rs (strip mount, join with backend base)
//!     → Return: ProxyTarget or Misconfiguration
//! ```
//!
//! # Design Decisions
//! - A single wildcard mount; no per-endpoint routing rules
//! - Deterministic: same config and URI always give the same target

pub mod target;

pub use target::{is_loopback, ProxyTarget};
