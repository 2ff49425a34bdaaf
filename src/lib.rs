//! TCP Load Balancer Library
//!
//! Accepts client connections, tracks which configured backends answer a TCP
//! connect, and relays each client to a live backend chosen round-robin.

pub mod config;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod server;

pub use config::BalancerConfig;
pub use error::{BalancerError, ListenerError, SessionError};
pub use lifecycle::Shutdown;
pub use server::Balancer;
