//! Response handling.
//!
//! # Responsibilities
//! - Map proxy failures to status codes with a short plain-text body
//! - Pass upstream responses through: status, every header instance, streamed body
//! - Abort a streamed body that outlives the request deadline

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{header, HeaderValue, Response, StatusCode};
use futures_util::Stream;
use hyper::body::Incoming;
use tokio::time::{Instant, Sleep};

/// Plain-text error response.
pub fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(format!("{message}\n")));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    response
}

/// No route matched the request.
pub fn no_route() -> Response<Body> {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable")
}

/// The matched route had no backend to offer.
pub fn no_upstream() -> Response<Body> {
    error_response(StatusCode::BAD_GATEWAY, "No upstream")
}

/// The outbound call failed or timed out.
pub fn bad_gateway() -> Response<Body> {
    error_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
}

/// Listener is up but no routing state has been published yet.
pub fn initializing() -> Response<Body> {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "service initializing")
}

/// Relay an upstream response without buffering its body.
pub fn from_upstream(response: Response<Incoming>) -> Response<Body> {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Like [`from_upstream`], but the body fails once `deadline` passes, so the
/// server aborts the response instead of completing it.
pub fn from_upstream_until(response: Response<Incoming>, deadline: Instant) -> Response<Body> {
    let (parts, body) = response.into_parts();
    let body = DeadlineBody {
        inner: Body::new(body).into_data_stream(),
        sleep: Box::pin(tokio::time::sleep_until(deadline)),
        expired: false,
    };
    Response::from_parts(parts, Body::from_stream(body))
}

/// Upstream body did not finish before the request deadline.
#[derive(Debug, thiserror::Error)]
#[error("upstream body exceeded the request deadline")]
pub struct DeadlineElapsed;

struct DeadlineBody {
    inner: BodyDataStream,
    sleep: Pin<Box<Sleep>>,
    expired: bool,
}

impl Stream for DeadlineBody {
    type Item = Result<Bytes, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.expired {
            return Poll::Ready(None);
        }
        if let Poll::Ready(item) = Pin::new(&mut self.inner).poll_next(cx) {
            return Poll::Ready(item);
        }
        if self.sleep.as_mut().poll(cx).is_ready() {
            self.expired = true;
            tracing::warn!(component = "router", "upstream body timed out, aborting response");
            return Poll::Ready(Some(Err(axum::Error::new(DeadlineElapsed))));
        }
        Poll::Pending
    }
}
