//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tcp_balancer::config::{BackendConfig, BalancerConfig};
use tcp_balancer::load_balancer::Registry;
use tcp_balancer::net::Listener;
use tcp_balancer::{Balancer, BalancerError, Shutdown};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::task::JoinHandle;

/// A line-oriented backend that answers every line with `<name>|<line>`.
pub struct TaggedBackend {
    pub name: &'static str,
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TaggedBackend {
    /// Start on an ephemeral port.
    pub async fn start(name: &'static str) -> Self {
        Self::start_on(name, "127.0.0.1:0".parse().unwrap()).await
    }

    /// Start on a specific address (used to bring a stopped backend back).
    pub async fn start_on(name: &'static str, addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_lines(name, socket));
            }
        });

        Self { name, addr, task }
    }

    /// Stop accepting. Connections made afterwards are refused.
    pub async fn stop(self) -> SocketAddr {
        self.task.abort();
        let _ = self.task.await;
        self.addr
    }
}

async fn serve_lines(name: &'static str, socket: TcpStream) {
    let (reader, mut writer) = socket.into_split();
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if writer.write_all(format!("{}|{}\n", name, line).as_bytes()).await.is_err() {
            break;
        }
    }
}

/// A running balancer under test.
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub registry: Arc<Registry>,
    pub shutdown: Shutdown,
    pub task: JoinHandle<Result<(), BalancerError>>,
}

/// Start a balancer on an ephemeral port over the given backend addresses.
pub async fn start_balancer(backends: &[SocketAddr], probe_interval_ms: u64) -> TestBalancer {
    let mut config = BalancerConfig::default();
    config.backends = backends
        .iter()
        .map(|a| BackendConfig { address: a.to_string() })
        .collect();
    config.health_check.interval_ms = probe_interval_ms;
    config.health_check.connect_timeout_ms = Some(1_000);
    config.lifecycle.drain_timeout_ms = 500;
    start_balancer_with(config).await
}

/// Start a balancer on an ephemeral port with a caller-built config.
pub async fn start_balancer_with(config: BalancerConfig) -> TestBalancer {
    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, 1_000).unwrap();

    let balancer = Balancer::new(config);
    let registry = balancer.registry();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(balancer.run(listener, shutdown.clone()));

    TestBalancer {
        addr,
        registry,
        shutdown,
        task,
    }
}

/// A backend whose accept queue is full, so new connects never complete.
///
/// The returned sockets must stay alive for the queue to stay full.
pub async fn unresponsive_backend() -> (SocketAddr, Vec<TcpStream>, TcpListener) {
    let socket = TcpSocket::new_v4().unwrap();
    socket.bind("127.0.0.1:0".parse().unwrap()).unwrap();
    let listener = socket.listen(0).unwrap();
    let addr = listener.local_addr().unwrap();

    let mut queued = Vec::new();
    for _ in 0..16 {
        match tokio::time::timeout(Duration::from_millis(200), TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => queued.push(stream),
            _ => break,
        }
    }
    (addr, queued, listener)
}

/// Open a client connection, send one line, return the tagged reply.
pub async fn round_trip(balancer: SocketAddr, payload: &str) -> String {
    let stream = TcpStream::connect(balancer).await.unwrap();
    let (reader, mut writer) = stream.into_split();
    writer.write_all(format!("{}\n", payload).as_bytes()).await.unwrap();

    let mut line = String::new();
    tokio::time::timeout(Duration::from_secs(5), BufReader::new(reader).read_line(&mut line))
        .await
        .expect("no reply through balancer")
        .unwrap();
    line.trim_end().to_string()
}

/// Backend name from a `<name>|<payload>` reply.
pub fn tag(reply: &str) -> &str {
    reply.split('|').next().unwrap_or_default()
}

/// Poll until the live set has `expected` members.
pub async fn wait_for_live(registry: &Registry, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while registry.live().len() != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "live set stuck at {} (wanted {})",
            registry.live().len(),
            expected
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
