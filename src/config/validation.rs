//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port non-zero, intervals > 0)
//! - Check backend addresses are well-formed `host:port` and unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::BalancerConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be between 1 and 65535")]
    InvalidPort,

    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,

    #[error("at least one backend must be configured")]
    NoBackends,

    #[error("backend address '{0}' is not of the form host:port")]
    MalformedAddress(String),

    #[error("backend address '{0}' is listed more than once")]
    DuplicateBackend(String),

    #[error("health_check.interval_ms must be greater than zero")]
    ZeroProbeInterval,

    #[error("tunnel.buffer_size must be greater than zero")]
    ZeroBufferSize,

    #[error("{0} must be greater than zero when set")]
    ZeroTimeout(&'static str),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    let mut seen = HashSet::new();
    for backend in &config.backends {
        if !is_host_port(&backend.address) {
            errors.push(ValidationError::MalformedAddress(backend.address.clone()));
        } else if !seen.insert(backend.address.as_str()) {
            errors.push(ValidationError::DuplicateBackend(backend.address.clone()));
        }
    }

    if config.health_check.interval_ms == 0 {
        errors.push(ValidationError::ZeroProbeInterval);
    }
    if config.health_check.connect_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout("health_check.connect_timeout_ms"));
    }
    if config.tunnel.buffer_size == 0 {
        errors.push(ValidationError::ZeroBufferSize);
    }
    if config.tunnel.connect_timeout_ms == Some(0) {
        errors.push(ValidationError::ZeroTimeout("tunnel.connect_timeout_ms"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `host:port` with a non-empty host and a port in 1..=65535.
/// IPv6 literals must be bracketed (`[::1]:80`).
fn is_host_port(address: &str) -> bool {
    let Some((host, port)) = address.rsplit_once(':') else {
        return false;
    };
    let host_ok = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').is_some_and(|h| !h.is_empty()),
        None => !host.is_empty() && !host.contains(':'),
    };
    host_ok && matches!(port.parse::<u16>(), Ok(p) if p != 0)
}
