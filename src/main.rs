//! hotswap-proxy: reverse proxy with live configuration reload.
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌──────────────────────── CONTROL PLANE ────────────────────────┐
//!  config.toml ───▶ │ ConfigWatcher → ConfigManager ──feed──▶ mailbox → event loop  │
//!                   │                                   build RouterState, swap ──┐ │
//!                   └─────────────────────────────────────────────────────────────┼─┘
//!                                                                                 ▼
//!                   ┌──────────────────────── DATA PLANE ───────────────────────────┐
//!  Client ────────▶ │ listener → axum-server → AtomicHandler → Router → UpstreamPool │ ──▶ Backend
//!  Client ◀──────── │                 streamed upstream response                      │ ◀── Backend
//!                   └───────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use hotswap_proxy::config::{FileConfigSource, ServerSettings, TlsSettings};
use hotswap_proxy::control::{ControlPlane, StartupError};
use hotswap_proxy::lifecycle::{wait_for_signal, Shutdown};

#[derive(Parser)]
#[command(name = "hotswap-proxy")]
#[command(about = "Reverse proxy with hot configuration reload", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy and serve until SIGINT/SIGTERM
    Start(StartArgs),
}

#[derive(Args, Debug)]
struct StartArgs {
    /// Listen port
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Serve HTTPS
    #[arg(long = "useTLS")]
    use_tls: bool,

    /// Local development mode (self-signed certificate, fresh log file)
    #[arg(long)]
    local: bool,

    /// Log file path
    #[arg(short = 'l', long = "logFile", default_value = "hotswap-proxy.log")]
    log_file: PathBuf,

    /// PEM certificate for --useTLS outside local mode
    #[arg(long = "tlsCert")]
    tls_cert: Option<PathBuf>,

    /// PEM private key for --useTLS outside local mode
    #[arg(long = "tlsKey")]
    tls_key: Option<PathBuf>,
}

impl StartArgs {
    fn server_settings(&self) -> Result<ServerSettings, StartupError> {
        let tls = match (self.use_tls, self.local, &self.tls_cert, &self.tls_key) {
            (false, ..) => TlsSettings::Disabled,
            (true, true, _, _) => TlsSettings::SelfSigned,
            (true, false, Some(cert), Some(key)) => TlsSettings::PemFiles {
                cert: cert.clone(),
                key: key.clone(),
            },
            (true, false, _, _) => return Err(StartupError::MissingCertificate),
        };

        Ok(ServerSettings {
            port: self.port,
            tls,
            local: self.local,
            log_file: Some(self.log_file.clone()),
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Start(args) => start(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(component = "controlplane", error = %e, "startup failed");
            // The subscriber may not exist yet.
            eprintln!("hotswap-proxy: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn start(args: StartArgs) -> Result<(), StartupError> {
    let settings = args.server_settings()?;
    let shutdown = Shutdown::new();

    let config_path = args.config.clone();
    let plane = ControlPlane::start(
        settings,
        || FileConfigSource::open(&config_path),
        shutdown.subscribe(),
    )
    .await?;

    if let Some(addr) = plane.local_addr() {
        tracing::info!(component = "controlplane", address = %addr, config = ?args.config, "ready");
    }

    if let Err(e) = wait_for_signal().await {
        tracing::error!(component = "controlplane", error = %e, "cannot wait for signals, shutting down");
    }

    shutdown.trigger();
    plane.stop().await;
    Ok(())
}
