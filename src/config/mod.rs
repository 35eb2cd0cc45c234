//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → manager.rs (current snapshot, Arc<Config>)
//!     → subscribers (control plane)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → manager.rs publishes (try_send, last reload wins)
//!     → control plane validates and swaps routing state
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Semantic validation happens when routing state is built, not here
//! - Server settings (port, TLS) are fixed at startup and passed explicitly

pub mod loader;
pub mod manager;
pub mod schema;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use manager::{ConfigManager, ConfigSource};
pub use schema::{Config, MatchSpec, ProxySettings, RouteSpec, ServerSettings, TlsSettings};
pub use watcher::{ConfigWatcher, FileConfigSource};
