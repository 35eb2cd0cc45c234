//! Header sanitation for forwarded requests.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers before forwarding
//! - Strip every header named in the incoming `Connection` value

use axum::http::header::{HeaderMap, HeaderName};

/// Headers meaningful for a single network hop only.
pub const HOP_BY_HOP: [&str; 9] = [
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers in place.
///
/// `Connection` tokens are collected before the fixed list is removed,
/// since `Connection` itself is on that list.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(axum::http::header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| HeaderName::from_bytes(token.as_bytes()).ok())
        .collect();

    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    for name in listed {
        headers.remove(name);
    }
}
