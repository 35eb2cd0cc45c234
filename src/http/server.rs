//! Data plane: listener and HTTP server lifecycle.
//!
//! # Responsibilities
//! - Bind the configured port (fatal on failure)
//! - Serve every request through the [`AtomicHandler`]
//! - Optional TLS via a [`CertificateProvider`](crate::net::tls::CertificateProvider)
//! - Bound slow request heads with a read-header timeout
//! - Graceful, idempotent shutdown with a drain deadline

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, Response};
use axum_server::Handle;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
use crate::http::handler::AtomicHandler;
use crate::net::listener::{self, ListenerError};
use crate::net::tls::{self, TlsError};
use crate::routing::Router;

/// Upper bound on receiving a request head.
pub const READ_HEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// How long in-flight requests get to finish once shutdown starts.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared cell the server reads the current router from.
pub type SharedHandler = Arc<AtomicHandler<Router>>;

/// Error type for data-plane startup.
#[derive(Debug, thiserror::Error)]
pub enum DataPlaneError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("data plane already started")]
    AlreadyStarted,

    #[error("data plane stopped")]
    Stopped,
}

/// Owns the listening socket and the serving task.
pub struct DataPlane {
    settings: ServerSettings,
    handler: OnceLock<SharedHandler>,
    handle: Handle,
    serve_task: Mutex<Option<JoinHandle<()>>>,
    local_addr: OnceLock<SocketAddr>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl DataPlane {
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            settings,
            handler: OnceLock::new(),
            handle: Handle::new(),
            serve_task: Mutex::new(None),
            local_addr: OnceLock::new(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Publish a new router. The handler cell is created on first use.
    pub fn update_http_handler(&self, router: Router) {
        let router = Arc::new(router);
        let mut created = false;
        let cell = self.handler.get_or_init(|| {
            created = true;
            Arc::new(AtomicHandler::new(Some(router.clone())))
        });
        if !created {
            cell.swap(router);
        }
    }

    /// The handler cell, if anything has been published or the server started.
    pub fn handler(&self) -> Option<SharedHandler> {
        self.handler.get().cloned()
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    pub fn settings(&self) -> &ServerSettings {
        &self.settings
    }

    /// Bind and start serving in the background.
    pub async fn start(&self) -> Result<SocketAddr, DataPlaneError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(DataPlaneError::Stopped);
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(DataPlaneError::AlreadyStarted);
        }

        let std_listener = listener::bind(self.settings.port).await?;
        let addr = std_listener
            .local_addr()
            .map_err(|source| ListenerError::Bind {
                addr: SocketAddr::from(([0, 0, 0, 0], self.settings.port)),
                source,
            })?;
        let _ = self.local_addr.set(addr);

        let tls = match tls::provider_for(&self.settings.tls) {
            Some(provider) => Some(provider.provision().await?),
            None => None,
        };

        let shared = self
            .handler
            .get_or_init(|| Arc::new(AtomicHandler::new(None)))
            .clone();

        let app = axum::Router::new()
            .fallback(proxy)
            .with_state(shared)
            .layer(TraceLayer::new_for_http())
            .into_make_service();

        let task = match tls {
            None => {
                let mut server = axum_server::from_tcp(std_listener);
                configure(server.http_builder());
                let serve = server.handle(self.handle.clone()).serve(app);
                tokio::spawn(async move {
                    if let Err(e) = serve.await {
                        tracing::error!(component = "dataplane", error = %e, "http server error");
                    }
                })
            }
            Some(config) => {
                let mut server = axum_server::from_tcp_rustls(std_listener, config);
                configure(server.http_builder());
                let serve = server.handle(self.handle.clone()).serve(app);
                tokio::spawn(async move {
                    if let Err(e) = serve.await {
                        tracing::error!(component = "dataplane", error = %e, "https server error");
                    }
                })
            }
        };
        *self.serve_task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        tracing::info!(
            component = "dataplane",
            address = %addr,
            tls = self.settings.tls != crate::config::TlsSettings::Disabled,
            "listening"
        );
        Ok(addr)
    }

    /// Stop accepting, drain in-flight requests for up to [`SHUTDOWN_TIMEOUT`],
    /// then force-close. Only the first call does anything.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::info!(component = "dataplane", "graceful shutdown started");
        self.handle.graceful_shutdown(Some(SHUTDOWN_TIMEOUT));

        let task = self
            .serve_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(task) = task else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT + Duration::from_secs(1), task).await {
            Ok(Ok(())) => tracing::info!(component = "dataplane", "stopped"),
            Ok(Err(e)) => {
                tracing::error!(component = "dataplane", error = %e, "server task failed")
            }
            Err(_) => {
                tracing::warn!(component = "dataplane", "graceful shutdown timed out, forcing close");
                self.handle.shutdown();
            }
        }
    }
}

impl std::fmt::Debug for DataPlane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPlane")
            .field("settings", &self.settings)
            .field("local_addr", &self.local_addr.get())
            .field("stopped", &self.stopped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn configure(builder: &mut ConnBuilder<TokioExecutor>) {
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(READ_HEADER_TIMEOUT);
}

async fn proxy(State(handler): State<SharedHandler>, request: Request<Body>) -> Response<Body> {
    handler.serve(request).await
}
