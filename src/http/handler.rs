//! Swappable request handler.
//!
//! # Responsibilities
//! - Publish "the current handler" to every connection
//! - Replace it without blocking readers or writers
//! - Answer 503 until a first handler is published
//!
//! # Design Decisions
//! - `ArcSwapOption` over the concrete handler type; no type erasure on the read path
//! - A reader holds its own `Arc` for the whole request, so a swap mid-request
//!   never mixes two handlers

use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use axum::body::Body;
use axum::http::{Request, Response};

use crate::http::response;

/// Something that turns a request into a response.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, req: Request<Body>) -> impl Future<Output = Response<Body>> + Send;
}

/// Lock-free cell holding the currently published handler.
pub struct AtomicHandler<H> {
    current: ArcSwapOption<H>,
}

impl<H: Handler> AtomicHandler<H> {
    /// Create the cell. With `None`, requests get `503 service initializing`
    /// until the first [`swap`](Self::swap).
    pub fn new(initial: Option<Arc<H>>) -> Self {
        Self {
            current: ArcSwapOption::new(initial),
        }
    }

    /// Publish `handler`. `None` is ignored; a handler is never unpublished.
    pub fn swap(&self, handler: impl Into<Option<Arc<H>>>) {
        if let Some(handler) = handler.into() {
            self.current.store(Some(handler));
        }
    }

    /// The handler currently published, if any.
    pub fn current(&self) -> Option<Arc<H>> {
        self.current.load_full()
    }

    /// Delegate to whatever handler is published right now.
    pub async fn serve(&self, req: Request<Body>) -> Response<Body> {
        match self.current.load_full() {
            Some(handler) => handler.handle(req).await,
            None => response::initializing(),
        }
    }
}

impl<H: Handler> Default for AtomicHandler<H> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<H> std::fmt::Debug for AtomicHandler<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicHandler")
            .field("published", &self.current.load().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[derive(Debug)]
    struct Fixed(u16);

    impl Handler for Fixed {
        fn handle(&self, _req: Request<Body>) -> impl Future<Output = Response<Body>> + Send {
            let status = StatusCode::from_u16(self.0).unwrap();
            async move {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = status;
                response
            }
        }
    }

    fn req() -> Request<Body> {
        Request::builder().uri("/").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_default_is_initializing() {
        let cell: AtomicHandler<Fixed> = AtomicHandler::new(None);
        let response = cell.serve(req()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"service initializing\n");
    }

    #[tokio::test]
    async fn test_swap_replaces_handler() {
        let cell = AtomicHandler::new(Some(Arc::new(Fixed(200))));
        assert_eq!(cell.serve(req()).await.status(), StatusCode::OK);

        cell.swap(Arc::new(Fixed(418)));
        assert_eq!(cell.serve(req()).await.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn test_swap_none_is_noop() {
        let cell = AtomicHandler::new(Some(Arc::new(Fixed(204))));
        cell.swap(None::<Arc<Fixed>>);
        assert_eq!(cell.serve(req()).await.status(), StatusCode::NO_CONTENT);
        assert!(cell.current().is_some());
    }

    #[tokio::test]
    async fn test_concurrent_swap_and_serve() {
        let cell = Arc::new(AtomicHandler::new(Some(Arc::new(Fixed(200)))));

        let writer = {
            let cell = cell.clone();
            tokio::spawn(async move {
                for i in 0..500 {
                    let status = if i % 2 == 0 { 201 } else { 202 };
                    cell.swap(Arc::new(Fixed(status)));
                    tokio::task::yield_now().await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                tokio::spawn(async move {
                    for _ in 0..500 {
                        let status = cell.serve(req()).await.status().as_u16();
                        assert!(matches!(status, 200 | 201 | 202));
                    }
                })
            })
            .collect();

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }
    }
}
