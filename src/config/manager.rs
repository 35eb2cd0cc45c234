//! Current configuration snapshot and change fan-out.
//!
//! # Design Decisions
//! - Subscriber channels hold one snapshot; delivery is `try_send` and a full
//!   slot drops the update. Consumers always converge on the newest snapshot
//!   they do receive, not on every intermediate version.
//! - A new subscription is primed with the current snapshot so a change that
//!   lands between `snapshot()` and `subscribe()` is not lost.

use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::config::loader::ConfigError;
use crate::config::schema::Config;

/// Capacity of each subscriber channel.
const SUBSCRIBER_CAPACITY: usize = 1;

/// Supplies the initial configuration and a feed of later snapshots.
pub trait ConfigSource: Send + Sync + 'static {
    /// The current snapshot.
    fn snapshot(&self) -> Result<Arc<Config>, ConfigError>;

    /// A feed of snapshots, starting with the current one.
    fn subscribe(&self) -> mpsc::Receiver<Arc<Config>>;
}

#[derive(Debug, Default)]
struct Inner {
    current: Option<Arc<Config>>,
    subscribers: Vec<mpsc::Sender<Arc<Config>>>,
}

/// Holds the authoritative snapshot and broadcasts replacements.
#[derive(Debug, Default)]
pub struct ConfigManager {
    inner: RwLock<Inner>,
}

impl ConfigManager {
    /// Create a manager seeded with an initial snapshot.
    pub fn new(initial: Config) -> Self {
        Self {
            inner: RwLock::new(Inner {
                current: Some(Arc::new(initial)),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Replace the current snapshot and notify subscribers.
    pub fn publish(&self, config: Config) {
        let config = Arc::new(config);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.current = Some(config.clone());

        inner.subscribers.retain(|tx| match tx.try_send(config.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(component = "config", "subscriber busy, dropping snapshot");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }
}

impl ConfigSource for ConfigManager {
    fn snapshot(&self) -> Result<Arc<Config>, ConfigError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
            .ok_or(ConfigError::Missing)
    }

    fn subscribe(&self) -> mpsc::Receiver<Arc<Config>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = &inner.current {
            let _ = tx.try_send(current.clone());
        }
        inner.subscribers.push(tx);
        rx
    }
}

impl<S: ConfigSource> ConfigSource for Arc<S> {
    fn snapshot(&self) -> Result<Arc<Config>, ConfigError> {
        (**self).snapshot()
    }

    fn subscribe(&self) -> mpsc::Receiver<Arc<Config>> {
        (**self).subscribe()
    }
}
