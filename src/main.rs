//! TCP Load Balancer
//!
//! A byte-transparent TCP load balancer built with Tokio.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌────────────────────────────────────────────────────┐
//!                     │                  TCP BALANCER                       │
//!                     │                                                     │
//!   Client            │  ┌──────────┐    ┌──────────────┐    ┌──────────┐  │
//!   ──────────────────┼─▶│   net    │───▶│load_balancer │───▶│  tunnel  │──┼──▶ Backend
//!   ◀─────────────────┼──│ listener │    │ round robin  │    │  relay   │◀─┼─── Server
//!                     │  └──────────┘    └──────┬───────┘    └──────────┘  │
//!                     │                         │ reads                     │
//!                     │                  ┌──────┴───────┐                   │
//!                     │                  │   registry   │◀── publish ──┐    │
//!                     │                  │  (live set)  │              │    │
//!                     │                  └──────────────┘      ┌───────┴──┐ │
//!                     │                                        │  health  │ │
//!                     │                                        │  prober  │ │
//!                     │                                        └──────────┘ │
//!                     └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use tcp_balancer::config::{read_config, validate_config, BackendConfig, BalancerConfig, ConfigError};
use tcp_balancer::lifecycle::{signals, Shutdown};
use tcp_balancer::net::Listener;
use tcp_balancer::observability::{logging, metrics};
use tcp_balancer::Balancer;

#[derive(Parser, Debug)]
#[command(name = "tcp-balancer")]
#[command(about = "Round-robin TCP load balancer with active health probing", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to accept client connections on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Backend address (host:port). Repeat for each backend; replaces the file's list.
    #[arg(short = 'b', long = "backend")]
    backends: Vec<String>,

    /// Time between health probe cycles.
    #[arg(long)]
    probe_interval_ms: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load the file (if any) and apply flag overrides, then validate.
    fn into_config(self) -> Result<BalancerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => BalancerConfig::default(),
        };

        if let Some(port) = self.port {
            config.listener.port = port;
        }
        if !self.backends.is_empty() {
            config.backends = self.backends.iter().map(|a| BackendConfig::from(a.as_str())).collect();
        }
        if let Some(interval) = self.probe_interval_ms {
            config.health_check.interval_ms = interval;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    logging::init_logging(&config.observability)?;

    tracing::info!("tcp-balancer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        port = config.listener.port,
        backends = ?config.backend_addresses(),
        probe_interval_ms = config.health_check.interval_ms,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            signals::wait_for_signal().await;
            shutdown.trigger();
        });
    }

    Balancer::new(config).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
