//! Control plane actor.
//!
//! # Responsibilities
//! - Run the startup sequence in order (logging, config, first build, publish, listen)
//! - Serialize config changes and shutdown through one mailbox
//! - Rebuild and publish routing state on every accepted snapshot
//! - Own orderly shutdown of the data plane and the logger
//!
//! # Design Decisions
//! - The config feed is bridged into the mailbox by a separate task, so the loop
//!   never sends to itself
//! - Cancellation and an explicit `Shutdown` take the same exit path
//! - The bridge holds only a weak sender, so dropping the handle closes the
//!   mailbox and shuts the loop down
//! - Terminal: a stopped control plane is not restarted

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::config::{Config, ConfigError, ConfigSource, ServerSettings};
use crate::control::message::ControlMessage;
use crate::http::server::{DataPlane, DataPlaneError};
use crate::lifecycle::ShutdownSignal;
use crate::observability::logging::{self, LogGuard, LoggingError, LoggingOptions};
use crate::routing::{BuildError, Router, RouterState};

/// Mailbox depth. Senders wait when it is full.
pub const MAILBOX_CAPACITY: usize = 16;

/// Heartbeat period of the event loop.
pub const TICK_INTERVAL: Duration = Duration::from_secs(10);

const INITIAL_GENERATION: u64 = 1;

/// Fatal errors before the listener is serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("initial routing state: {0}")]
    Build(#[from] BuildError),

    #[error("data plane: {0}")]
    DataPlane(#[from] DataPlaneError),

    #[error("--useTLS outside local mode needs both --tlsCert and --tlsKey")]
    MissingCertificate,
}

#[derive(Debug, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("control plane stopped")]
    Stopped,
}

/// Handle to the running control loop.
pub struct ControlPlane {
    mailbox: mpsc::Sender<ControlMessage>,
    done: watch::Receiver<bool>,
    generation: Arc<AtomicU64>,
    data_plane: Arc<DataPlane>,
}

impl ControlPlane {
    /// Bring the proxy up. Returns once the listener is accepting.
    ///
    /// `open_source` is called after logging is initialized; any error from it,
    /// from the first snapshot, or from the first build is fatal.
    pub async fn start<S, F>(
        settings: ServerSettings,
        open_source: F,
        shutdown: ShutdownSignal,
    ) -> Result<Self, StartupError>
    where
        S: ConfigSource,
        F: FnOnce() -> Result<S, ConfigError>,
    {
        let log_guard = logging::init(&LoggingOptions::from_settings(&settings))?;
        tracing::info!(
            component = "controlplane",
            port = settings.port,
            local = settings.local,
            "starting"
        );

        let source = open_source()?;
        let initial = source.snapshot()?;
        let state = RouterState::build(&initial)?.with_generation(INITIAL_GENERATION);
        let routes = state.routes().len();

        let data_plane = Arc::new(DataPlane::new(settings));
        data_plane.update_http_handler(Router::new(state));
        tracing::info!(
            component = "controlplane",
            generation = INITIAL_GENERATION,
            routes,
            "initial routing state published"
        );

        data_plane.start().await?;

        let generation = Arc::new(AtomicU64::new(INITIAL_GENERATION));
        let (mailbox_tx, mailbox_rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (done_tx, done_rx) = watch::channel(false);

        let event_loop = EventLoop {
            mailbox: mailbox_rx,
            shutdown,
            data_plane: data_plane.clone(),
            log_guard,
            generation: generation.clone(),
            done: done_tx,
        };
        tokio::spawn(event_loop.run());

        // Take the primed snapshot now so the feed slot is free for the next change.
        let mut feed = source.subscribe();
        let pending = feed
            .try_recv()
            .ok()
            .filter(|config| !Arc::ptr_eq(config, &initial));
        tokio::spawn(bridge(source, pending, feed, mailbox_tx.downgrade(), done_rx.clone()));

        Ok(Self {
            mailbox: mailbox_tx,
            done: done_rx,
            generation,
            data_plane,
        })
    }

    /// Enqueue a message, waiting while the mailbox is full.
    pub async fn send(&self, message: ControlMessage) -> Result<(), ControlPlaneError> {
        self.mailbox
            .send(message)
            .await
            .map_err(|_| ControlPlaneError::Stopped)
    }

    /// Request shutdown and wait until the data plane has drained and the
    /// logger has stopped. Safe to call repeatedly or after cancellation.
    pub async fn stop(&self) {
        if self.send(ControlMessage::Shutdown).await.is_err() {
            tracing::debug!(component = "controlplane", "loop already finished");
        }
        let mut done = self.done.clone();
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Generation of the routing state currently served. Starts at 1.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.data_plane.local_addr()
    }

    pub fn data_plane(&self) -> &Arc<DataPlane> {
        &self.data_plane
    }

    pub fn is_stopped(&self) -> bool {
        *self.done.borrow()
    }
}

impl std::fmt::Debug for ControlPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlPlane")
            .field("generation", &self.generation())
            .field("local_addr", &self.local_addr())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

struct EventLoop {
    mailbox: mpsc::Receiver<ControlMessage>,
    shutdown: ShutdownSignal,
    data_plane: Arc<DataPlane>,
    log_guard: LogGuard,
    generation: Arc<AtomicU64>,
    done: watch::Sender<bool>,
}

impl EventLoop {
    async fn run(mut self) {
        let mut ticker = time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                message = self.mailbox.recv() => match message {
                    Some(ControlMessage::ConfigUpdated(config)) => self.apply(config),
                    Some(ControlMessage::Shutdown) => {
                        tracing::info!(component = "controlplane", "shutdown requested");
                        break;
                    }
                    None => {
                        tracing::info!(component = "controlplane", "mailbox closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    tracing::trace!(
                        component = "controlplane",
                        generation = self.generation.load(Ordering::SeqCst),
                        "tick"
                    );
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!(component = "controlplane", "cancellation received");
                    break;
                }
            }
        }

        // Blocked and later senders fail instead of waiting on a dead loop.
        self.mailbox.close();

        self.data_plane.stop().await;
        tracing::info!(component = "controlplane", "stopped");
        self.log_guard.stop();
        self.done.send_replace(true);
    }

    fn apply(&self, config: Option<Arc<Config>>) {
        let Some(config) = config else {
            tracing::debug!(component = "controlplane", "ignoring empty config update");
            return;
        };

        let next = self.generation.load(Ordering::SeqCst) + 1;
        match RouterState::build(&config) {
            Ok(state) => {
                let routes = state.routes().len();
                self.data_plane
                    .update_http_handler(Router::new(state.with_generation(next)));
                self.generation.store(next, Ordering::SeqCst);
                tracing::info!(
                    component = "controlplane",
                    generation = next,
                    routes,
                    "config applied"
                );
            }
            Err(e) => {
                tracing::warn!(
                    component = "controlplane",
                    error = %e,
                    "config rejected, keeping previous routing state"
                );
            }
        }
    }
}

/// Forward the source's feed into the mailbox until the loop finishes.
/// Owns the source so a file watcher lives exactly as long as the loop.
/// The mailbox is held weakly: only the handle keeps it open.
async fn bridge<S: ConfigSource>(
    source: S,
    mut pending: Option<Arc<Config>>,
    mut feed: mpsc::Receiver<Arc<Config>>,
    mailbox: mpsc::WeakSender<ControlMessage>,
    mut done: watch::Receiver<bool>,
) {
    loop {
        let config = match pending.take() {
            Some(config) => config,
            None => tokio::select! {
                config = feed.recv() => match config {
                    Some(config) => config,
                    None => break,
                },
                _ = async { let _ = done.wait_for(|finished| *finished).await; } => break,
            },
        };

        let Some(mailbox) = mailbox.upgrade() else {
            break;
        };
        if mailbox
            .send(ControlMessage::ConfigUpdated(Some(config)))
            .await
            .is_err()
        {
            break;
        }
    }
    drop(source);
}
