//! Upstream pool for one route.
//!
//! # Responsibilities
//! - Own the ordered backends of a route
//! - Select the next backend round-robin without locking

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;

/// Error type for pool construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("no upstream URLs found")]
    Empty,

    #[error("failed to parse the URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Ordered backends plus a shared selection counter.
#[derive(Debug)]
pub struct UpstreamPool {
    backends: Vec<Arc<Backend>>,
    next: AtomicU64,
}

impl UpstreamPool {
    /// Build a pool from upstream URL strings. Empty pools are rejected here,
    /// not at request time.
    pub fn new<S: AsRef<str>>(urls: &[S]) -> Result<Self, PoolError> {
        if urls.is_empty() {
            return Err(PoolError::Empty);
        }

        let backends = urls
            .iter()
            .map(|raw| Backend::parse(raw.as_ref()).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            backends,
            next: AtomicU64::new(0),
        })
    }

    /// Select the next backend.
    ///
    /// Each call claims a distinct counter value, so any window of `len()`
    /// consecutive calls visits every backend once. `fetch_add` wraps on overflow.
    pub fn next(&self) -> Option<Arc<Backend>> {
        if self.backends.is_empty() {
            return None;
        }

        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let index = (n % self.backends.len() as u64) as usize;
        Some(self.backends[index].clone())
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn empty_for_test() -> Self {
        Self {
            backends: Vec::new(),
            next: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    fn with_counter(urls: &[&str], start: u64) -> Self {
        let pool = Self::new(urls).unwrap();
        pool.next.store(start, Ordering::Relaxed);
        pool
    }
}
