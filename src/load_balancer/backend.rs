//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream target
//! - Validate the upstream URL once, at construction

use url::Url;

use crate::load_balancer::pool::PoolError;

/// A single upstream target. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    url: Url,
}

impl Backend {
    /// Parse and validate an upstream URL.
    ///
    /// Only absolute `http`/`https` URLs with a host are accepted.
    pub fn parse(raw: &str) -> Result<Self, PoolError> {
        let invalid = |reason: &str| PoolError::InvalidUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    /// Host and optional explicit port, as it belongs in a `Host` header.
    pub fn authority(&self) -> String {
        let host = self.url.host_str().unwrap_or_default();
        match self.url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }

    /// Base path requests are joined onto. A bare origin has base path `/`.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Raw query string, empty when absent.
    pub fn query(&self) -> &str {
        self.url.query().unwrap_or_default()
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.url.fmt(f)
    }
}
