//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, registry::LiveSet, LoadBalancer};

/// Round-robin selector.
/// Stores an internal counter to rotate through the live set.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, live: &LiveSet) -> Option<Arc<Backend>> {
        // Checked before the modulo; an empty set leaves the counter alone.
        if live.is_empty() {
            return None;
        }

        // Wraps on overflow, which only shifts the rotation offset.
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(live[count % live.len()].clone())
    }
}
