//! Backend registry.
//!
//! # Responsibilities
//! - Hold the static list of configured backends
//! - Hold the current live set as an immutable snapshot
//! - Lock-free reads for selection, atomic replacement for the prober
//!
//! ```text
//! Prober  ── publish(LiveSet) ──▶ ArcSwap::store()   (whole-set replacement)
//! Session ── live() ────────────▶ ArcSwap::load_full() (never sees a partial set)
//! ```

use std::ops::Deref;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::load_balancer::backend::Backend;

/// Ordered snapshot of backends that answered the most recent probe cycle.
///
/// Empty is a valid state meaning no backend is reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSet {
    backends: Vec<Arc<Backend>>,
}

impl LiveSet {
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        Self { backends }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn contains(&self, backend: &Backend) -> bool {
        self.backends.iter().any(|b| b.as_ref() == backend)
    }
}

impl Deref for LiveSet {
    type Target = [Arc<Backend>];
    fn deref(&self) -> &Self::Target {
        &self.backends
    }
}

impl FromIterator<Arc<Backend>> for LiveSet {
    fn from_iter<I: IntoIterator<Item = Arc<Backend>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Configured backends plus the currently published live set.
#[derive(Debug)]
pub struct Registry {
    configured: Vec<Arc<Backend>>,
    live: ArcSwap<LiveSet>,
}

impl Registry {
    /// Create a registry over the configured addresses.
    ///
    /// The live set starts empty until the first probe cycle publishes.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configured: addresses
                .into_iter()
                .map(|a| Arc::new(Backend::new(a)))
                .collect(),
            live: ArcSwap::from_pointee(LiveSet::empty()),
        }
    }

    /// All configured backends, in configuration order.
    pub fn configured(&self) -> &[Arc<Backend>] {
        &self.configured
    }

    /// The latest published live set.
    pub fn live(&self) -> Arc<LiveSet> {
        self.live.load_full()
    }

    /// Replace the live set. Visible to every subsequent `live()` call.
    pub fn publish(&self, live: LiveSet) {
        self.live.store(Arc::new(live));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let registry = Registry::new(["127.0.0.1:9001", "127.0.0.1:9002"]);
        assert_eq!(registry.configured().len(), 2);
        assert!(registry.live().is_empty());
    }

    #[test]
    fn publish_replaces_whole_set() {
        let registry = Registry::new(["a:1", "b:2", "c:3"]);
        let all: LiveSet = registry.configured().iter().cloned().collect();
        registry.publish(all);
        assert_eq!(registry.live().len(), 3);

        let only_c = LiveSet::new(vec![registry.configured()[2].clone()]);
        registry.publish(only_c);

        let live = registry.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].address(), "c:3");
        assert!(!live.contains(&Backend::new("a:1")));
    }

    #[test]
    fn held_snapshot_is_unaffected_by_publish() {
        let registry = Registry::new(["a:1", "b:2"]);
        registry.publish(registry.configured().iter().cloned().collect());

        let before = registry.live();
        registry.publish(LiveSet::empty());

        assert_eq!(before.len(), 2);
        assert!(registry.live().is_empty());
    }
}
