//! TLS certificate provisioning.
//!
//! # Responsibilities
//! - Supply the listener's rustls configuration
//! - Generate a self-signed certificate for local mode
//! - Load externally issued PEM files otherwise
//!
//! # Design Decisions
//! - Provisioning is a trait so other certificate sources can plug into the data plane

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use futures_util::future::BoxFuture;

use crate::config::TlsSettings;

/// Names the self-signed certificate is valid for.
const LOCAL_NAMES: [&str; 2] = ["localhost", "127.0.0.1"];

/// Error type for TLS provisioning.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("failed to generate self-signed certificate: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("{kind} file not found: {path:?}")]
    NotFound { kind: &'static str, path: PathBuf },

    #[error("invalid TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Source of the listener certificate.
pub trait CertificateProvider: Send + Sync {
    fn provision(&self) -> BoxFuture<'_, Result<RustlsConfig, TlsError>>;
}

/// In-process self-signed certificate for local development.
#[derive(Debug, Default, Clone)]
pub struct SelfSigned;

impl CertificateProvider for SelfSigned {
    fn provision(&self) -> BoxFuture<'_, Result<RustlsConfig, TlsError>> {
        Box::pin(async {
            let names: Vec<String> = LOCAL_NAMES.iter().map(|n| n.to_string()).collect();
            let certified = rcgen::generate_simple_self_signed(names)?;

            let cert_pem = certified.cert.pem();
            let key_pem = certified.key_pair.serialize_pem();

            tracing::info!(component = "dataplane", "generated self-signed certificate");
            Ok(RustlsConfig::from_pem(cert_pem.into_bytes(), key_pem.into_bytes()).await?)
        })
    }
}

/// Certificate and private key PEM files issued elsewhere.
#[derive(Debug, Clone)]
pub struct PemFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl CertificateProvider for PemFiles {
    fn provision(&self) -> BoxFuture<'_, Result<RustlsConfig, TlsError>> {
        Box::pin(async move {
            ensure_exists("certificate", &self.cert)?;
            ensure_exists("private key", &self.key)?;
            Ok(RustlsConfig::from_pem_file(&self.cert, &self.key).await?)
        })
    }
}

fn ensure_exists(kind: &'static str, path: &Path) -> Result<(), TlsError> {
    if path.exists() {
        Ok(())
    } else {
        Err(TlsError::NotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// Provider for the configured TLS mode, `None` for plain HTTP.
pub fn provider_for(settings: &TlsSettings) -> Option<Box<dyn CertificateProvider>> {
    match settings {
        TlsSettings::Disabled => None,
        TlsSettings::SelfSigned => Some(Box::new(SelfSigned)),
        TlsSettings::PemFiles { cert, key } => Some(Box::new(PemFiles {
            cert: cert.clone(),
            key: key.clone(),
        })),
    }
}
