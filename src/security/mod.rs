//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (drop Host and framing headers, pin Accept-Encoding)
//!     → Forwarder
//!
//! Backend response:
//!     → headers.rs (drop stale framing headers, add no-store + diagnostics)
//!     → Caller
//! ```
//!
//! # Design Decisions
//! - No credential inspection: Authorization is relayed as-is
//! - Proxied responses are never cacheable

pub mod headers;
