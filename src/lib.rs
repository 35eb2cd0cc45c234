//! Reverse proxy with a control-plane/data-plane split and hot configuration reload.

pub mod config;
pub mod control;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::{Config, ServerSettings};
pub use control::{ControlMessage, ControlPlane};
pub use http::{AtomicHandler, DataPlane};
pub use lifecycle::Shutdown;
