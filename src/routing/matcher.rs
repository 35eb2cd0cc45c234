//! Route matching logic.
//!
//! # Responsibilities
//! - Match host (set membership, case-insensitive)
//! - Match path prefix (case-sensitive, byte-wise)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110 host names)
//! - Path matching is case-sensitive
//! - Empty condition = always matches (wildcard)
//! - No regex to guarantee O(n) matching

use axum::http::header::HOST;
use axum::http::Request;

/// Host the request is addressed to: the `Host` header, else the URI authority.
pub fn request_host<B>(req: &Request<B>) -> &str {
    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .or_else(|| req.uri().host())
        .unwrap_or_default()
}

/// Matches the request host against a set of names.
#[derive(Debug, Clone, Default)]
pub struct HostMatcher {
    hosts: Vec<String>,
}

impl HostMatcher {
    /// Names are normalized to lowercase once, here.
    pub fn new<S: AsRef<str>>(hosts: &[S]) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.as_ref().to_ascii_lowercase()).collect(),
        }
    }

    pub fn matches(&self, host: &str) -> bool {
        self.hosts.is_empty() || self.hosts.iter().any(|h| h.eq_ignore_ascii_case(host))
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone, Default)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.as_bytes().starts_with(self.prefix.as_bytes())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Host AND path prefix.
#[derive(Debug, Clone, Default)]
pub struct RouteMatcher {
    pub host: HostMatcher,
    pub path: PathPrefixMatcher,
}

impl RouteMatcher {
    pub fn matches<B>(&self, req: &Request<B>) -> bool {
        self.host.matches(request_host(req)) && self.path.matches(req.uri().path())
    }
}
