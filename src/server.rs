//! Balancer assembly and the accept loop.
//!
//! # Responsibilities
//! - Build the registry, selector and tunnel from configuration
//! - Start the health prober
//! - Accept clients and spawn one session task per connection
//! - Stop on shutdown or a fatal listener error, then drain sessions

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::config::BalancerConfig;
use crate::error::{BalancerError, SessionError};
use crate::health::HealthProber;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Registry, RoundRobin};
use crate::net::{Accept, ConnectionPermit, ConnectionTracker, Tunnel};
use crate::observability::metrics;

/// The TCP load balancer.
pub struct Balancer {
    config: BalancerConfig,
    registry: Arc<Registry>,
    tunnel: Arc<Tunnel>,
    tracker: ConnectionTracker,
}

impl Balancer {
    /// Create a balancer with the given configuration.
    pub fn new(config: BalancerConfig) -> Self {
        let registry = Arc::new(Registry::new(config.backend_addresses()));
        let tunnel = Arc::new(Tunnel::new(
            registry.clone(),
            Arc::new(RoundRobin::new()),
            &config.tunnel,
        ));

        Self {
            config,
            registry,
            tunnel,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Shared handle on the registry (configured backends and live set).
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Handle on the live-session counter.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Run until `shutdown` fires or the listener fails.
    ///
    /// Accepting starts at once; the live set stays empty until the prober's
    /// first cycle completes. A fatal accept error triggers `shutdown` itself
    /// (stopping the prober) and is returned once sessions have drained.
    pub async fn run<A: Accept>(self, listener: A, shutdown: Shutdown) -> Result<(), BalancerError> {
        let mut stop = shutdown.subscribe();

        let prober = HealthProber::new(self.registry.clone(), &self.config.health_check);
        let prober_task = tokio::spawn(prober.run(shutdown.subscribe()));

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(
                address = %addr,
                backends = self.registry.configured().len(),
                "Accepting connections"
            );
        }

        let result = loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.dispatch(stream, peer, permit),
                    Err(e) if e.is_fatal() => {
                        tracing::error!(error = %e, "Listener failed, shutting down");
                        break Err(e);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Transient accept error");
                    }
                },
                _ = stop.recv() => {
                    tracing::info!("Shutdown requested, no longer accepting");
                    break Ok(());
                }
            }
        };

        drop(listener);
        shutdown.trigger();
        if let Err(e) = prober_task.await {
            tracing::error!(error = %e, "Health prober task failed");
        }

        let drain_timeout = self.config.lifecycle.drain_timeout();
        if !self.tracker.wait_for_idle(drain_timeout).await {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                drain_timeout_ms = drain_timeout.as_millis() as u64,
                "Sessions still open after drain timeout"
            );
        }

        tracing::info!("Balancer stopped");
        result.map_err(BalancerError::from)
    }

    /// Hand a client to its own session task and return immediately.
    fn dispatch(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let tunnel = self.tunnel.clone();
        let guard = self.tracker.track();

        tokio::spawn(async move {
            let _permit = permit;
            let id = guard.id();
            metrics::session_started();

            match tunnel.serve(id, stream, peer).await {
                Ok(summary) => {
                    tracing::debug!(
                        session = %id,
                        peer = %peer,
                        backend = %summary.backend,
                        bytes_upstream = summary.bytes_upstream,
                        bytes_downstream = summary.bytes_downstream,
                        closed_by = ?summary.closed_by,
                        "Session closed"
                    );
                    metrics::record_session("relayed");
                }
                Err(e @ SessionError::RelayIo(_)) => {
                    tracing::debug!(session = %id, peer = %peer, error = %e, "Session ended with I/O error");
                    metrics::record_session(e.kind());
                }
                Err(e) => {
                    tracing::warn!(session = %id, peer = %peer, error = %e, "Session failed");
                    metrics::record_session(e.kind());
                }
            }

            metrics::session_finished();
            drop(guard);
        });
    }
}
