//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (DataPlane: axum-server, read-header timeout, drain)
//!     → handler.rs (AtomicHandler: load the current router)
//!     → [routing layer matches route and picks backend]
//!     → request.rs (rewrite URI, strip hop-by-hop headers)
//!     → response.rs (relay upstream response or map failure)
//!     → Send to client
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{AtomicHandler, Handler};
pub use server::{DataPlane, DataPlaneError};
