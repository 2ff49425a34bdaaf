//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limits)
//!     → connection.rs (session ID, lifetime tracking)
//!     → tunnel.rs (select backend, connect, relay both ways)
//!
//! Session States:
//!     Accepted → Selecting → Connecting → Relaying → Closing → Terminated
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Each session tracked for shutdown draining
//! - Byte-transparent: nothing is parsed or framed

pub mod connection;
pub mod listener;
pub mod tunnel;

pub use connection::{ConnectionTracker, SessionId};
pub use listener::{Accept, ConnectionPermit, Listener};
pub use tunnel::{CloseReason, SessionState, SessionSummary, Tunnel};
