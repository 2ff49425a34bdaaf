//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap backend connects with an optional deadline
//! - Keep timeout errors distinct from other connect errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - No deadline configured means the OS connect timeout applies

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time;

/// Why a backend connect did not produce a stream.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Connect to `address` (`host:port`), bounded by `timeout` when set.
pub async fn connect(address: &str, timeout: Option<Duration>) -> Result<TcpStream, ConnectError> {
    match timeout {
        Some(limit) => match time::timeout(limit, TcpStream::connect(address)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ConnectError::TimedOut(limit)),
        },
        None => Ok(TcpStream::connect(address).await?),
    }
}
