//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use same_origin_relay::config::RelayConfig;
use same_origin_relay::lifecycle::Shutdown;
use same_origin_relay::relay::encode_target;
use same_origin_relay::RelayServer;
use tokio::net::TcpListener;

/// Serve `app` as a stand-in remote host on an ephemeral port.
pub async fn start_upstream(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// A running relay and the handle that stops it.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestRelay {
    /// Relay URL for `target`.
    pub fn url_for(&self, target: &str) -> String {
        encode_target(&format!("http://{}/proxy", self.addr), target)
    }

    /// Relay URL with a literal, unencoded query string.
    pub fn raw_url(&self, query: &str) -> String {
        format!("http://{}/proxy{}", self.addr, query)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a relay with default settings on an ephemeral port.
pub async fn start_relay() -> TestRelay {
    start_relay_with(RelayConfig::default()).await
}

pub async fn start_relay_with(mut config: RelayConfig) -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let server = RelayServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestRelay { addr, shutdown }
}

/// A caller that never goes through an environment proxy.
pub fn caller() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Deterministic, non-text payload of `len` bytes.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

/// An address nothing is listening on.
pub async fn dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
