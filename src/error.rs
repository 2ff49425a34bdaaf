//! Error types shared across the balancer.
//!
//! Session errors stay inside the session that raised them; only a
//! [`ListenerError`] escalates to stopping the whole balancer.

use std::io;

use thiserror::Error;

use crate::load_balancer::Backend;
use crate::resilience::timeouts::ConnectError;

/// Why a single client session failed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The live set was empty at selection time.
    #[error("no backend available")]
    NoBackendAvailable,

    /// The selected backend refused or could not be reached.
    #[error("failed to connect to backend {backend}: {source}")]
    BackendConnect {
        backend: Backend,
        #[source]
        source: ConnectError,
    },

    /// A read or write on either leg failed while relaying.
    #[error("relay I/O error: {0}")]
    RelayIo(#[from] io::Error),
}

impl SessionError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::NoBackendAvailable => "no_backend",
            SessionError::BackendConnect { .. } => "connect_failed",
            SessionError::RelayIo(_) => "relay_error",
        }
    }
}

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(io::Error),

    /// Failed to accept connection.
    #[error("Failed to accept: {0}")]
    Accept(io::Error),
}

impl ListenerError {
    /// Whether the accept loop must stop.
    ///
    /// Errors tied to a single pending connection are transient; anything
    /// else means the listening socket itself is unusable.
    pub fn is_fatal(&self) -> bool {
        match self {
            ListenerError::Bind(_) => true,
            ListenerError::Accept(e) => !matches!(
                e.kind(),
                io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
            ),
        }
    }
}

/// Error returned by `Balancer::run`.
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_error_classification() {
        let transient = ListenerError::Accept(io::Error::from(io::ErrorKind::ConnectionAborted));
        assert!(!transient.is_fatal());

        let fatal = ListenerError::Accept(io::Error::from(io::ErrorKind::InvalidInput));
        assert!(fatal.is_fatal());

        let bind = ListenerError::Bind(io::Error::from(io::ErrorKind::AddrInUse));
        assert!(bind.is_fatal());
    }

    #[test]
    fn session_error_messages_name_the_backend() {
        let err = SessionError::BackendConnect {
            backend: Backend::new("10.0.0.9:80"),
            source: ConnectError::Io(io::Error::from(io::ErrorKind::ConnectionRefused)),
        };
        assert!(err.to_string().contains("10.0.0.9:80"));
        assert_eq!(err.kind(), "connect_failed");
        assert_eq!(SessionError::NoBackendAvailable.kind(), "no_backend");
    }
}
