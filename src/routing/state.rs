//! Immutable routing snapshot.
//!
//! # Responsibilities
//! - Compile route specs into routes, one upstream pool each
//! - Validate every upstream list; fail the whole build on the first bad route
//! - Own the outbound transport shared by every request routed through it
//!
//! # Design Decisions
//! - Built wholesale on each reload, never edited afterwards
//! - Build is pure: `&Config → Result<RouterState, BuildError>`
//! - Superseded states are dropped, there is no explicit teardown

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use crate::config::{Config, RouteSpec};
use crate::load_balancer::{LbStrategy, PoolError, UpstreamPool};
use crate::routing::matcher::{HostMatcher, PathPrefixMatcher, RouteMatcher};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Connection-pooling outbound client.
pub type Transport = Client<HttpsConnector<HttpConnector>, Body>;

/// Error type for routing state construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("route {route:?}: no upstream URLs found")]
    NoUpstreamUrls { route: String },

    #[error("route {route:?}: invalid upstream URL {url:?}: {reason}")]
    InvalidUpstreamUrl {
        route: String,
        url: String,
        reason: String,
    },
}

impl BuildError {
    fn from_pool(route: &str, err: PoolError) -> Self {
        match err {
            PoolError::Empty => BuildError::NoUpstreamUrls {
                route: route.to_string(),
            },
            PoolError::InvalidUrl { url, reason } => BuildError::InvalidUpstreamUrl {
                route: route.to_string(),
                url,
                reason,
            },
        }
    }
}

/// Build the outbound transport.
pub fn new_transport(max_idle: usize, idle_timeout: Duration) -> Transport {
    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(CONNECT_TIMEOUT));
    http.set_keepalive(Some(TCP_KEEPALIVE));

    let https = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http);

    Client::builder(TokioExecutor::new())
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(max_idle)
        .pool_idle_timeout(idle_timeout)
        .build(https)
}

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub matcher: RouteMatcher,
    pub pool: UpstreamPool,
    pub strategy: LbStrategy,
}

impl Route {
    fn compile(spec: &RouteSpec) -> Result<Self, BuildError> {
        let pool = UpstreamPool::new(spec.upstreams.as_slice())
            .map_err(|e| BuildError::from_pool(&spec.name, e))?;

        Ok(Self {
            name: spec.name.clone(),
            matcher: RouteMatcher {
                host: HostMatcher::new(spec.matcher.hosts.as_slice()),
                path: PathPrefixMatcher::new(spec.matcher.path_prefix.clone()),
            },
            pool,
            strategy: LbStrategy::resolve(&spec.name, &spec.lb),
        })
    }
}

/// One complete, immutable routing configuration.
pub struct RouterState {
    routes: Vec<Route>,
    transport: Transport,
    timeout: Duration,
    generation: u64,
}

impl RouterState {
    /// Compile `config`. Any invalid route fails the whole build.
    pub fn build(config: &Config) -> Result<Self, BuildError> {
        let routes = config
            .routes
            .iter()
            .map(Route::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_routes(
            routes,
            new_transport(
                config.proxy.max_idle_connections,
                config.proxy.idle_connection_timeout,
            ),
            config.proxy.default_timeout,
        ))
    }

    pub(crate) fn from_routes(routes: Vec<Route>, transport: Transport, timeout: Duration) -> Self {
        Self {
            routes,
            transport,
            timeout,
            generation: 0,
        }
    }

    /// Tag this state with the reload generation it was built for.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// First route, in declaration order, whose host and path conditions pass.
    pub fn match_request<B>(&self, req: &Request<B>) -> Option<&Route> {
        self.routes.iter().find(|route| route.matcher.matches(req))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Per-request deadline; zero means none.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for RouterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterState")
            .field("routes", &self.routes)
            .field("timeout", &self.timeout)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
