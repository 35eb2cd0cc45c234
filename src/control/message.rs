//! Control plane mailbox messages.

use std::sync::Arc;

use crate::config::Config;

/// Everything the control loop reacts to through its mailbox.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// A new configuration snapshot. `None` is ignored.
    ConfigUpdated(Option<Arc<Config>>),
    /// Drain the data plane, stop logging and end the loop.
    Shutdown,
}
