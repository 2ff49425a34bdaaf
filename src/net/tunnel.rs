//! Per-connection tunnel: select a backend, connect, relay bytes both ways.
//!
//! # State Machine
//! ```text
//! Accepted → Selecting → Connecting → Relaying → Closing → Terminated
//!                │            │
//!                └────────────┴──▶ Failed (client closed, no retry)
//! ```
//!
//! # Relaying
//! Two copy flows run concurrently, client→backend and backend→client, each
//! with its own reusable buffer. The first flow to finish (EOF or error) ends
//! the session: both sockets are shut down and dropped, which cancels the
//! other flow. Bytes are never inspected.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::TunnelConfig;
use crate::error::SessionError;
use crate::load_balancer::{Backend, LoadBalancer, Registry};
use crate::net::connection::SessionId;
use crate::observability::metrics;
use crate::resilience::timeouts;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Accepted,
    Selecting,
    Connecting,
    Relaying,
    Closing,
    Terminated,
    Failed,
}

/// Which flow ended the session, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent EOF.
    ClientClosed,
    /// Backend sent EOF.
    BackendClosed,
}

/// What a finished session did.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: SessionId,
    pub backend: Arc<Backend>,
    /// Bytes copied client → backend.
    pub bytes_upstream: u64,
    /// Bytes copied backend → client.
    pub bytes_downstream: u64,
    pub closed_by: CloseReason,
}

/// Shared, per-balancer half of the tunnel: registry, selector and settings.
#[derive(Debug)]
pub struct Tunnel {
    registry: Arc<Registry>,
    selector: Arc<dyn LoadBalancer>,
    buffer_size: usize,
    connect_timeout: Option<Duration>,
}

impl Tunnel {
    pub fn new(registry: Arc<Registry>, selector: Arc<dyn LoadBalancer>, config: &TunnelConfig) -> Self {
        Self {
            registry,
            selector,
            buffer_size: config.buffer_size,
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Run one session to completion.
    ///
    /// Both sockets are closed by the time this returns, whatever the outcome.
    pub async fn serve(
        &self,
        id: SessionId,
        client: TcpStream,
        peer: SocketAddr,
    ) -> Result<SessionSummary, SessionError> {
        let mut session = Session::new(id, peer);
        let result = session.run(self, client).await;
        session.finish();
        result
    }
}

/// One client connection and, once connected, its backend.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    peer: SocketAddr,
    state: SessionState,
}

impl Session {
    fn new(id: SessionId, peer: SocketAddr) -> Self {
        Self {
            id,
            peer,
            state: SessionState::Accepted,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        tracing::trace!(session = %self.id, from = ?self.state, to = ?next, "Session state change");
        self.state = next;
    }

    async fn run(&mut self, tunnel: &Tunnel, mut client: TcpStream) -> Result<SessionSummary, SessionError> {
        self.transition(SessionState::Selecting);
        let live = tunnel.registry.live();
        let Some(backend) = tunnel.selector.next_server(&live) else {
            self.fail(&mut client).await;
            return Err(SessionError::NoBackendAvailable);
        };

        self.transition(SessionState::Connecting);
        let mut upstream = match timeouts::connect(backend.address(), tunnel.connect_timeout).await {
            Ok(stream) => stream,
            Err(source) => {
                self.fail(&mut client).await;
                return Err(SessionError::BackendConnect {
                    backend: (*backend).clone(),
                    source,
                });
            }
        };

        tracing::debug!(session = %self.id, peer = %self.peer, backend = %backend, "Relaying");
        self.transition(SessionState::Relaying);
        let outcome = relay(&mut client, &mut upstream, tunnel.buffer_size).await;

        self.transition(SessionState::Closing);
        let _ = client.shutdown().await;
        let _ = upstream.shutdown().await;
        drop(client);
        drop(upstream);

        let outcome = outcome?;
        Ok(SessionSummary {
            id: self.id,
            backend,
            bytes_upstream: outcome.upstream,
            bytes_downstream: outcome.downstream,
            closed_by: outcome.closed_by,
        })
    }

    async fn fail(&mut self, client: &mut TcpStream) {
        self.transition(SessionState::Failed);
        let _ = client.shutdown().await;
    }

    fn finish(&mut self) {
        if self.state != SessionState::Failed {
            self.transition(SessionState::Terminated);
        }
    }
}

/// Byte counts when the first flow ended.
#[derive(Debug)]
struct RelayOutcome {
    upstream: u64,
    downstream: u64,
    closed_by: CloseReason,
}

/// Run both copy flows until either one ends.
///
/// Byte counts of the flow that lost the race are those copied before it was
/// cancelled. An I/O error on either leg ends the session as an error.
async fn relay(client: &mut TcpStream, backend: &mut TcpStream, buffer_size: usize) -> std::io::Result<RelayOutcome> {
    let (mut client_rd, mut client_wr) = client.split();
    let (mut backend_rd, mut backend_wr) = backend.split();

    let mut upstream = 0u64;
    let mut downstream = 0u64;

    let result = {
        let to_backend = copy_flow(&mut client_rd, &mut backend_wr, buffer_size, &mut upstream);
        let to_client = copy_flow(&mut backend_rd, &mut client_wr, buffer_size, &mut downstream);

        tokio::select! {
            r = to_backend => r.map(|()| CloseReason::ClientClosed),
            r = to_client => r.map(|()| CloseReason::BackendClosed),
        }
    };

    metrics::record_bytes("upstream", upstream);
    metrics::record_bytes("downstream", downstream);

    result.map(|closed_by| RelayOutcome {
        upstream,
        downstream,
        closed_by,
    })
}

/// Copy until EOF on `reader`, reusing one buffer. `copied` is updated after
/// every write so partial progress survives cancellation.
async fn copy_flow<R, W>(reader: &mut R, writer: &mut W, buffer_size: usize, copied: &mut u64) -> std::io::Result<()>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; buffer_size];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write_all(&buf[..n]).await?;
        *copied += n as u64;
    }
}
