//! Outbound request construction.
//!
//! # Responsibilities
//! - Rewrite scheme and authority to the selected backend
//! - Join the backend base path with the request path
//! - Merge backend and request query strings
//! - Strip hop-by-hop headers and set `Host` to the backend
//!
//! # Design Decisions
//! - The inbound body is moved, never buffered
//! - Outbound requests are always HTTP/1.1 regardless of the inbound version

use axum::body::Body;
use axum::http::header::{HeaderValue, HOST};
use axum::http::{Request, Uri, Version};

use crate::load_balancer::Backend;
use crate::security::strip_hop_by_hop;

/// Error building the outbound request.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("invalid upstream uri: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    #[error("invalid host header: {0}")]
    Host(#[from] axum::http::header::InvalidHeaderValue),
}

/// Join a backend base path and a request path with exactly one `/` between them.
pub fn join_path(base: &str, suffix: &str) -> String {
    if base.is_empty() {
        return suffix.to_string();
    }

    match (base.ends_with('/'), suffix.starts_with('/')) {
        (true, true) => format!("{}{}", base, &suffix[1..]),
        (false, false) => format!("{base}/{suffix}"),
        _ => format!("{base}{suffix}"),
    }
}

/// Concatenate two raw query strings, with `&` only when both are non-empty.
pub fn merge_query(backend: &str, request: &str) -> String {
    if backend.is_empty() || request.is_empty() {
        format!("{backend}{request}")
    } else {
        format!("{backend}&{request}")
    }
}

/// Rewrite an inbound request so it targets `backend`.
pub fn build_upstream_request(
    req: Request<Body>,
    backend: &Backend,
) -> Result<Request<Body>, RequestError> {
    let (mut parts, body) = req.into_parts();

    let path = join_path(backend.path(), parts.uri.path());
    let query = merge_query(backend.query(), parts.uri.query().unwrap_or_default());
    let authority = backend.authority();

    let uri = if query.is_empty() {
        format!("{}://{}{}", backend.scheme(), authority, path)
    } else {
        format!("{}://{}{}?{}", backend.scheme(), authority, path, query)
    };
    parts.uri = uri.parse::<Uri>()?;
    parts.version = Version::HTTP_11;

    strip_hop_by_hop(&mut parts.headers);
    parts.headers.insert(HOST, HeaderValue::from_str(&authority)?);

    Ok(Request::from_parts(parts, body))
}
