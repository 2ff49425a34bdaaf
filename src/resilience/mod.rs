//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Connect to backend (probe or session):
//!     → timeouts.rs (optional connect deadline)
//!     → On failure: reported to the caller, never retried
//! ```
//!
//! # Design Decisions
//! - A failed session connect fails that session only; no fallback backend
//! - A failed probe connect only drops the backend from this cycle

pub mod timeouts;
