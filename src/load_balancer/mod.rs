//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → route's UpstreamPool
//!     → pool.rs (atomic counter mod pool size)
//!     → backend.rs (parsed upstream URL)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - One pool per route, built fresh on every reload
//! - The selection counter is the only state mutated per request
//! - Empty pools are rejected at construction

pub mod backend;
pub mod pool;
pub mod strategy;

pub use backend::Backend;
pub use pool::{PoolError, UpstreamPool};
pub use strategy::LbStrategy;
