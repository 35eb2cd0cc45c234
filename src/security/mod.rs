//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request headers
//!     → headers.rs (strip hop-by-hop + Connection-listed headers)
//!     → forwarded to upstream
//! ```

pub mod headers;

pub use headers::strip_hop_by_hop;
