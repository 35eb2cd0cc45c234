//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems emit tracing events tagged with `component`
//!     → logging.rs (EnvFilter)
//!     → stdout layer
//!     → file layer (non-blocking writer, flushed on LogGuard::stop)
//! ```

pub mod logging;

pub use logging::{LogGuard, LoggingError, LoggingOptions};
