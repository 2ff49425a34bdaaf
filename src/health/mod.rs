//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active probing (active.rs):
//!     Periodic timer
//!     → Connect to every configured backend (concurrently)
//!     → Collect successes in configuration order
//!     → Publish as the registry's new live set
//! ```
//!
//! # Design Decisions
//! - A probe is a bare TCP connect; the balancer is protocol-agnostic
//! - Each cycle stands alone: one failed connect removes a backend, one
//!   success restores it
//! - Probe failures are logged, never surfaced to clients

pub mod active;

pub use active::HealthProber;
