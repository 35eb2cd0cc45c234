//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (Router bound to one RouterState)
//!     → matcher.rs (evaluate host set AND path prefix)
//!     → Return: first matching Route or 503
//!
//! Route Compilation (on every config snapshot):
//!     RouteSpec[]
//!     → state.rs (one UpstreamPool per route, shared transport)
//!     → Freeze as immutable RouterState
//! ```
//!
//! # Design Decisions
//! - Routes compiled per snapshot, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (declaration order)

pub mod matcher;
pub mod router;
pub mod state;

pub use router::Router;
pub use state::{BuildError, Route, RouterState};
