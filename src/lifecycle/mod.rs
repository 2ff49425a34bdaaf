//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Bind listener → Start prober → Accept
//!
//! Shutdown (shutdown.rs):
//!     Signal received or listener fault → Stop accepting + stop prober
//!     → Drain sessions (bounded) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Accepting starts with the prober; clients arriving before its first cycle completes are closed
//! - Shutdown has timeout: sessions still relaying after the drain deadline are dropped

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
