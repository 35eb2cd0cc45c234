//! Configuration file watcher for hot reload.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::manager::{ConfigManager, ConfigSource};
use crate::config::schema::Config;

/// A watcher that reloads the configuration file into a [`ConfigManager`].
pub struct ConfigWatcher {
    path: PathBuf,
    manager: Arc<ConfigManager>,
}

impl ConfigWatcher {
    pub fn new(path: &Path, manager: Arc<ConfigManager>) -> Self {
        Self {
            path: path.to_path_buf(),
            manager,
        }
    }

    /// Start watching on notify's background thread.
    ///
    /// The parent directory is watched, not the file, so saves that replace the
    /// file (write to a temp file, then rename over it) keep being seen.
    /// The returned watcher must be kept alive for events to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let manager = self.manager.clone();
        let path = self.path.clone();
        let file_name = self.path.file_name().map(|name| name.to_os_string());
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !is_reload_event(&event, file_name.as_deref()) {
                        return;
                    }
                    match load_config(&path) {
                        Ok(new_config) => {
                            manager.publish(new_config);
                            tracing::info!(component = "config", path = ?path, "reloaded");
                        }
                        Err(e) => {
                            tracing::warn!(component = "config", error = %e, "reload failed");
                        }
                    }
                }
                Err(e) => tracing::error!(component = "config", error = ?e, "watch error"),
            },
            NotifyConfig::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(component = "config", path = ?self.path, dir = ?dir, "config watcher started");
        Ok(watcher)
    }
}

/// A create, write or rename that touches the config file itself.
fn is_reload_event(event: &Event, file_name: Option<&OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    (event.kind.is_modify() || event.kind.is_create())
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name))
}

/// File-backed configuration source: initial load, then live reloads.
pub struct FileConfigSource {
    manager: Arc<ConfigManager>,
    _watcher: RecommendedWatcher,
}

impl FileConfigSource {
    /// Load `path` and start watching it.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let initial = load_config(path)?;
        let manager = Arc::new(ConfigManager::new(initial));

        let watcher = ConfigWatcher::new(path, manager.clone())
            .run()
            .map_err(|source| ConfigError::Watch {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(Self {
            manager,
            _watcher: watcher,
        })
    }
}

impl ConfigSource for FileConfigSource {
    fn snapshot(&self) -> Result<Arc<Config>, ConfigError> {
        self.manager.snapshot()
    }

    fn subscribe(&self) -> mpsc::Receiver<Arc<Config>> {
        self.manager.subscribe()
    }
}
