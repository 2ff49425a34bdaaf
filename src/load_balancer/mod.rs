//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Client accepted
//!     → registry.rs (snapshot the current live set)
//!     → round_robin.rs (rotate through the live set)
//!     → backend.rs (address to connect to)
//!     → Return backend or NoBackendAvailable
//! ```
//!
//! # Design Decisions
//! - Selection never blocks: the live set is an immutable snapshot
//! - The only shared counter is a single atomic
//! - Absent backends are simply not in the snapshot

use std::sync::Arc;

pub mod backend;
pub mod registry;
pub mod round_robin;

pub use backend::Backend;
pub use registry::{LiveSet, Registry};
pub use round_robin::RoundRobin;

/// Strategy for picking a backend out of a live set.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick a backend, or `None` when the live set is empty.
    fn next_server(&self, live: &LiveSet) -> Option<Arc<Backend>>;
}
