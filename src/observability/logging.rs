//! Structured logging.
//!
//! # Responsibilities
//! - Install the global subscriber (stdout, optional log file)
//! - Hand back a guard whose `stop` flushes the file writer
//!
//! # Design Decisions
//! - Level is controlled by `RUST_LOG`, falling back to the default directives
//! - A second `init` in the same process keeps the first subscriber

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServerSettings;

/// Filter directives used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "hotswap_proxy=info,tower_http=info";

/// Error type for logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to open log file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where and how to log.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub log_file: Option<PathBuf>,
    /// Start the log file empty instead of appending.
    pub truncate: bool,
    pub directives: String,
}

impl LoggingOptions {
    /// Options derived from the server settings. Local mode truncates the file.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            log_file: settings.log_file.clone(),
            truncate: settings.local,
            directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }

    /// Stdout only.
    pub fn stdout() -> Self {
        Self {
            log_file: None,
            truncate: false,
            directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self::stdout()
    }
}

/// Keeps the file writer alive until stopped.
#[derive(Debug, Default)]
pub struct LogGuard {
    worker: Mutex<Option<WorkerGuard>>,
}

impl LogGuard {
    /// Flush and close the file writer. Later calls do nothing.
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(worker);
    }

    pub fn is_stopped(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Install the global subscriber.
pub fn init(options: &LoggingOptions) -> Result<LogGuard, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&options.directives));

    let (file_layer, worker) = match &options.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(!options.truncate)
                .truncate(options.truncate)
                .open(path)
                .map_err(|source| LoggingError::Open {
                    path: path.clone(),
                    source,
                })?;
            let (writer, worker) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(worker))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        tracing::debug!(component = "controlplane", "global subscriber already installed");
    }

    Ok(LogGuard {
        worker: Mutex::new(worker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unwritable_log_file_is_error() {
        let options = LoggingOptions {
            log_file: Some("/nope/dir/proxy.log".into()),
            ..LoggingOptions::stdout()
        };
        assert!(matches!(init(&options), Err(LoggingError::Open { .. })));
    }

    #[test]
    fn test_local_mode_truncates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stale line").unwrap();

        let settings = ServerSettings {
            log_file: Some(file.path().to_path_buf()),
            local: true,
            ..Default::default()
        };
        let guard = init(&LoggingOptions::from_settings(&settings)).unwrap();
        guard.stop();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(!contents.contains("stale line"));
    }

    #[test]
    fn test_append_keeps_existing_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "earlier run").unwrap();

        let options = LoggingOptions {
            log_file: Some(file.path().to_path_buf()),
            truncate: false,
            ..LoggingOptions::stdout()
        };
        init(&options).unwrap().stop();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("earlier run"));
    }

    #[test]
    fn test_stop_is_repeatable() {
        let guard = init(&LoggingOptions::stdout()).unwrap();
        guard.stop();
        guard.stop();
        assert!(guard.is_stopped());
    }
}
