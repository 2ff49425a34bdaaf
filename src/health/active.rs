//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every configured backend with a bare TCP connect
//! - Publish a fresh live set after each complete cycle

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, LiveSet, Registry};
use crate::observability::metrics;
use crate::resilience::timeouts;

pub struct HealthProber {
    registry: Arc<Registry>,
    interval: Duration,
    connect_timeout: Option<Duration>,
}

impl HealthProber {
    pub fn new(registry: Arc<Registry>, config: &HealthCheckConfig) -> Self {
        Self {
            registry,
            interval: config.interval(),
            connect_timeout: config.connect_timeout(),
        }
    }

    /// Probe on every tick until shutdown is signalled.
    ///
    /// A cycle still in flight when shutdown arrives is dropped unpublished.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_ms = self.interval.as_millis() as u64,
            backends = self.registry.configured().len(),
            "Health prober starting"
        );

        // First tick fires immediately.
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let cycle = async {
                ticker.tick().await;
                self.probe_cycle().await
            };

            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
                live = cycle => {
                    if let Some(live) = live {
                        self.publish(live);
                    }
                }
            }
        }
    }

    /// Probe every configured backend concurrently.
    ///
    /// Returns the backends that accepted a connection, in configuration order,
    /// or `None` if any probe task died, in which case the previous live set
    /// must stay current. Dropping the returned future aborts probes still in
    /// flight.
    pub async fn probe_cycle(&self) -> Option<LiveSet> {
        let handles: Vec<_> = self
            .registry
            .configured()
            .iter()
            .map(|backend| {
                let backend = Arc::clone(backend);
                let connect_timeout = self.connect_timeout;
                tokio::spawn(async move {
                    let alive = probe(&backend, connect_timeout).await;
                    (backend, alive)
                })
            })
            .collect();

        let _in_flight = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());
        collect_cycle(join_all(handles).await)
    }

    /// Replace the registry's live set, logging membership changes.
    pub fn publish(&self, live: LiveSet) {
        let previous = self.registry.live();

        for backend in self.registry.configured() {
            let was_live = previous.contains(backend);
            let is_live = live.contains(backend);
            match (was_live, is_live) {
                (false, true) => tracing::info!(backend = %backend, "Backend joined live set"),
                (true, false) => tracing::warn!(backend = %backend, "Backend left live set"),
                _ => {}
            }
            metrics::record_backend_up(backend.address(), is_live);
        }

        if live.is_empty() && !previous.is_empty() {
            tracing::error!("No backend is reachable");
        }

        metrics::record_probe_cycle(true, live.len());
        self.registry.publish(live);
    }
}

/// Fold probe results into a live set, or nothing if any task died.
fn collect_cycle(results: Vec<Result<(Arc<Backend>, bool), JoinError>>) -> Option<LiveSet> {
    let mut live = Vec::with_capacity(results.len());
    let mut aborted = false;
    for result in results {
        match result {
            Ok((backend, true)) => live.push(backend),
            Ok((_, false)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Probe task failed, keeping previous live set");
                aborted = true;
            }
        }
    }

    if aborted {
        metrics::record_probe_cycle(false, 0);
        None
    } else {
        Some(LiveSet::new(live))
    }
}

/// Aborts the wrapped tasks when dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Open and immediately close a connection to the backend.
async fn probe(backend: &Backend, connect_timeout: Option<Duration>) -> bool {
    match timeouts::connect(backend.address(), connect_timeout).await {
        Ok(stream) => {
            drop(stream);
            true
        }
        Err(e) => {
            tracing::debug!(backend = %backend, error = %e, "Probe failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use tokio::net::TcpListener;

    async fn listening() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    async fn closed_port() -> String {
        let (listener, addr) = listening().await;
        drop(listener);
        addr
    }

    fn prober(registry: &Arc<Registry>, interval_ms: u64) -> HealthProber {
        let config = HealthCheckConfig {
            interval_ms,
            connect_timeout_ms: Some(1_000),
        };
        HealthProber::new(registry.clone(), &config)
    }

    #[tokio::test]
    async fn cycle_keeps_configuration_order_of_live_backends() {
        let (_l1, a1) = listening().await;
        let a2 = closed_port().await;
        let (_l3, a3) = listening().await;
        let a4 = closed_port().await;
        let (_l5, a5) = listening().await;

        let registry = Arc::new(Registry::new([a1.clone(), a2, a3.clone(), a4, a5.clone()]));
        let live = prober(&registry, 500).probe_cycle().await.unwrap();

        let addresses: Vec<_> = live.iter().map(|b| b.address().to_string()).collect();
        assert_eq!(addresses, vec![a1, a3, a5]);
    }

    #[tokio::test]
    async fn all_unreachable_yields_empty_set() {
        let registry = Arc::new(Registry::new([closed_port().await, closed_port().await]));
        let live = prober(&registry, 500).probe_cycle().await.unwrap();
        assert!(live.is_empty());
    }

    #[tokio::test]
    async fn publish_replaces_rather_than_merges() {
        let (_l1, a1) = listening().await;
        let (l2, a2) = listening().await;
        let registry = Arc::new(Registry::new([a1.clone(), a2.clone()]));
        let prober = prober(&registry, 500);

        let live = prober.probe_cycle().await.unwrap();
        prober.publish(live);
        assert_eq!(registry.live().len(), 2);

        drop(l2);
        let live = prober.probe_cycle().await.unwrap();
        prober.publish(live);

        let current = registry.live();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].address(), a1);
    }

    #[tokio::test]
    async fn run_publishes_until_shutdown() {
        let (_l1, a1) = listening().await;
        let registry = Arc::new(Registry::new([a1]));
        let shutdown = Shutdown::new();

        let task = tokio::spawn(prober(&registry, 20).run(shutdown.subscribe()));

        let deadline = time::Instant::now() + Duration::from_secs(5);
        while registry.live().is_empty() {
            assert!(time::Instant::now() < deadline, "live set never published");
            time::sleep(Duration::from_millis(10)).await;
        }

        shutdown.trigger();
        time::timeout(Duration::from_secs(5), task)
            .await
            .expect("prober did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn dead_probe_task_discards_cycle() {
        let (_l1, a1) = listening().await;
        let registry = Arc::new(Registry::new([a1.clone()]));
        let prober = prober(&registry, 500);
        prober.publish(prober.probe_cycle().await.unwrap());

        let alive = Arc::clone(&registry.configured()[0]);
        let finished = tokio::spawn(async move { (alive, true) });
        let killed = tokio::spawn(std::future::pending::<(Arc<Backend>, bool)>());
        killed.abort();

        let results = vec![finished.await, killed.await];
        assert!(results[1].as_ref().unwrap_err().is_cancelled());
        assert!(collect_cycle(results).is_none());

        // Nothing to publish, so the previous set is still current.
        assert_eq!(registry.live().len(), 1);
        assert_eq!(registry.live()[0].address(), a1);
    }

    #[tokio::test]
    async fn stops_publishing_after_shutdown() {
        let (l1, a1) = listening().await;
        let registry = Arc::new(Registry::new([a1]));
        let shutdown = Shutdown::new();

        let task = tokio::spawn(prober(&registry, 20).run(shutdown.subscribe()));
        while registry.live().is_empty() {
            time::sleep(Duration::from_millis(10)).await;
        }
        shutdown.trigger();
        task.await.unwrap();

        // Backend goes away; nobody is left to notice.
        drop(l1);
        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.live().len(), 1);
    }
}
