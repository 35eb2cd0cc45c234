//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Data plane start
//!     → listener.rs (bind port, fatal on failure)
//!     → tls.rs (optional certificate provisioning)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS is optional and handled transparently
//! - Certificate sources are pluggable

pub mod listener;
pub mod tls;

pub use listener::ListenerError;
pub use tls::{CertificateProvider, PemFiles, SelfSigned, TlsError};
