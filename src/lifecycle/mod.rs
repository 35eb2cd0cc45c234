//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → main
//!
//! Shutdown (shutdown.rs):
//!     main triggers → ControlPlane loop observes → DataPlane drains → logger stops
//! ```
//!
//! # Design Decisions
//! - Cancellation is level-triggered: a late observer still sees it
//! - Shutdown has timeout: forced close after the drain deadline

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
