//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hotswap_proxy::config::{Config, MatchSpec, RouteSpec, ServerSettings};
use hotswap_proxy::ControlPlane;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a mock backend on an ephemeral port that answers every request with `body`.
pub async fn start_mock_backend(body: impl Into<String>) -> SocketAddr {
    start_slow_backend(Duration::ZERO, body).await
}

/// Like [`start_mock_backend`], but waits `delay` after reading the request.
pub async fn start_slow_backend(delay: Duration, body: impl Into<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body: Arc<str> = body.into().into();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// A port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn route(name: &str, hosts: &[&str], path_prefix: &str, upstreams: &[SocketAddr]) -> RouteSpec {
    RouteSpec {
        name: name.into(),
        matcher: MatchSpec {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            path_prefix: path_prefix.into(),
        },
        upstreams: upstreams.iter().map(|a| format!("http://{a}")).collect(),
        lb: "round-robin".into(),
    }
}

pub fn config(routes: Vec<RouteSpec>) -> Config {
    Config {
        routes,
        ..Default::default()
    }
}

pub fn ephemeral_settings() -> ServerSettings {
    ServerSettings {
        port: 0,
        ..Default::default()
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub fn proxy_url(plane: &ControlPlane, path: &str) -> String {
    let port = plane.local_addr().unwrap().port();
    format!("http://127.0.0.1:{port}{path}")
}

/// Poll until the control plane has applied `want` generations.
pub async fn wait_for_generation(plane: &ControlPlane, want: u64, within: Duration) {
    let deadline = tokio::time::Instant::now() + within;
    while plane.generation() < want {
        assert!(
            tokio::time::Instant::now() < deadline,
            "generation stuck at {}, wanted {want}",
            plane.generation()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
