//! Load-balancing strategy identifier.

/// Strategy named by a route's `lb` field.
///
/// Only round-robin is implemented; the field is reserved for more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LbStrategy {
    #[default]
    RoundRobin,
}

impl LbStrategy {
    /// Resolve an identifier. Unknown names fall back to round-robin with a warning,
    /// so a reload never fails on this field alone.
    pub fn resolve(route: &str, raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "round-robin" | "round_robin" | "roundrobin" => LbStrategy::RoundRobin,
            other => {
                tracing::warn!(
                    component = "router",
                    route = %route,
                    lb = %other,
                    "unsupported lb strategy, using round-robin"
                );
                LbStrategy::RoundRobin
            }
        }
    }
}
