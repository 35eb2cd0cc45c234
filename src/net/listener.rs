//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind the data-plane port on all interfaces
//! - Hand a non-blocking std listener to the HTTP server
//!
//! # Design Decisions
//! - Bind failure is returned, never panicked on; startup treats it as fatal

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind `0.0.0.0:<port>`. Port 0 picks an ephemeral port.
pub async fn bind(port: u16) -> Result<std::net::TcpListener, ListenerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let bind_err = |source| ListenerError::Bind { addr, source };

    let listener = TcpListener::bind(addr).await.map_err(bind_err)?;
    let local_addr = listener.local_addr().map_err(bind_err)?;

    tracing::info!(component = "dataplane", address = %local_addr, "listener bound");

    // into_std keeps the socket in non-blocking mode.
    listener.into_std().map_err(bind_err)
}
