//! Control plane subsystem.
//!
//! # Data Flow
//! ```text
//! ConfigSource feed ──bridge task──▶ mailbox ◀── ControlPlane::send / stop
//!                                      │
//!                                      ▼
//!                         plane.rs event loop (single writer)
//!                           ├─ ConfigUpdated → build RouterState → swap Router
//!                           ├─ tick (10s, liveness)
//!                           └─ Shutdown / cancellation → drain DataPlane → stop logger
//! ```
//!
//! # Design Decisions
//! - Exactly one task decides which RouterState is current
//! - A failed reload keeps the previous state; a failed first build is fatal

pub mod message;
pub mod plane;

pub use message::ControlMessage;
pub use plane::{ControlPlane, ControlPlaneError, StartupError};
