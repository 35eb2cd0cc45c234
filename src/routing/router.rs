//! Per-request routing and forwarding.
//!
//! # Responsibilities
//! - Match the request against one captured RouterState
//! - Pick a backend from the matched route's pool
//! - Forward with the state's transport and deadline (head and body)
//! - Turn every failure into a response: 503 no route, 502 no backend or upstream error
//!
//! # Design Decisions
//! - The state is captured at construction; a reload builds a new Router
//! - No retries at this layer
//! - Response bodies are streamed, never buffered

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use tokio::time::Instant;

use crate::http::handler::Handler;
use crate::http::request::build_upstream_request;
use crate::http::response;
use crate::routing::matcher::request_host;
use crate::routing::state::RouterState;

/// Request handler bound to one immutable routing snapshot.
#[derive(Debug, Clone)]
pub struct Router {
    state: Arc<RouterState>,
}

impl Router {
    pub fn new(state: impl Into<Arc<RouterState>>) -> Self {
        Self {
            state: state.into(),
        }
    }

    pub fn state(&self) -> &Arc<RouterState> {
        &self.state
    }

    /// Route and forward one request.
    pub async fn forward(&self, req: Request<Body>) -> Response<Body> {
        let state = &self.state;

        let Some(route) = state.match_request(&req) else {
            tracing::warn!(
                component = "router",
                host = %request_host(&req),
                path = %req.uri().path(),
                "no route matched"
            );
            return response::no_route();
        };

        let Some(backend) = route.pool.next() else {
            tracing::warn!(component = "router", route = %route.name, "no upstream in pool");
            return response::no_upstream();
        };

        tracing::debug!(
            component = "router",
            method = %req.method(),
            uri = %req.uri(),
            host = %request_host(&req),
            "incoming"
        );

        let out = match build_upstream_request(req, &backend) {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(component = "router", route = %route.name, error = %e, "cannot build upstream request");
                return response::bad_gateway();
            }
        };

        tracing::debug!(
            component = "router",
            method = %out.method(),
            uri = %out.uri(),
            route = %route.name,
            generation = state.generation(),
            "outgoing"
        );

        // One deadline covers the response head and the streamed body.
        let deadline = (!state.timeout().is_zero()).then(|| Instant::now() + state.timeout());

        let call = state.transport().request(out);
        let result = match deadline {
            None => call.await,
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        component = "router",
                        route = %route.name,
                        backend = %backend,
                        timeout = ?state.timeout(),
                        "upstream timed out"
                    );
                    return response::bad_gateway();
                }
            },
        };

        match result {
            Ok(upstream) => match deadline {
                Some(deadline) => response::from_upstream_until(upstream, deadline),
                None => response::from_upstream(upstream),
            },
            Err(e) => {
                tracing::warn!(
                    component = "router",
                    route = %route.name,
                    backend = %backend,
                    error = %e,
                    "upstream error"
                );
                response::bad_gateway()
            }
        }
    }
}

impl Handler for Router {
    fn handle(&self, req: Request<Body>) -> impl std::future::Future<Output = Response<Body>> + Send {
        self.forward(req)
    }
}
