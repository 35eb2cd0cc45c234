//! Configuration schema definitions.
//!
//! This module defines the reloadable routing configuration and the immutable
//! server settings supplied on the command line.
//! Reloadable types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root of the reloadable configuration.
///
/// A `Config` is never edited after it is parsed; a reload replaces it wholesale.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Proxy-wide defaults.
    pub proxy: ProxySettings,

    /// Route definitions, evaluated in declaration order.
    pub routes: Vec<RouteSpec>,
}

/// Proxy-wide defaults applied to every route.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProxySettings {
    /// Deadline for each outbound call. Zero disables it.
    #[serde(with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Maximum idle pooled connections kept per upstream host.
    pub max_idle_connections: usize,

    /// How long an idle pooled connection is kept.
    #[serde(with = "humantime_serde")]
    pub idle_connection_timeout: Duration,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            max_idle_connections: 100,
            idle_connection_timeout: Duration::from_secs(90),
        }
    }
}

/// One route as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RouteSpec {
    /// Route identifier for logging.
    pub name: String,

    /// Match criteria.
    #[serde(rename = "match")]
    pub matcher: MatchSpec,

    /// Upstream URLs, in selection order.
    pub upstreams: Vec<String>,

    /// Load-balancing strategy identifier.
    pub lb: String,
}

/// Request match criteria. Empty fields match everything.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct MatchSpec {
    /// Hostnames, compared case-insensitively.
    pub hosts: Vec<String>,

    /// Path prefix, compared byte-wise.
    pub path_prefix: String,
}

/// Immutable server settings, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Listen port. Zero asks the OS for an ephemeral port.
    pub port: u16,

    /// TLS mode for the listener.
    pub tls: TlsSettings,

    /// Local development mode.
    pub local: bool,

    /// Optional log file.
    pub log_file: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 8080,
            tls: TlsSettings::Disabled,
            local: false,
            log_file: None,
        }
    }
}

/// How the listener obtains its certificate, if at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TlsSettings {
    /// Plain HTTP.
    #[default]
    Disabled,

    /// In-process self-signed certificate.
    SelfSigned,

    /// Externally issued certificate and key, PEM encoded.
    PemFiles { cert: PathBuf, key: PathBuf },
}
