//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single configured backend server
//! - Identity is the configured `host:port` string; nothing about a backend
//!   changes after startup. Reachability lives in the registry's live set.

use std::fmt;

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Backend {
    /// The address of the backend, as configured (`host:port`).
    address: String,
}

impl Backend {
    /// Create a new backend.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    /// The configured `host:port`, passed unresolved to the socket layer.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}
