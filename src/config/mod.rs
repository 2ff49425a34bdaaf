//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)                CLI flags
//!     → loader.rs (parse)               │
//!     → merge overrides ◀───────────────┘
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → handed to the balancer at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the backend list never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    BackendConfig, BalancerConfig, HealthCheckConfig, LifecycleConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, TunnelConfig,
};
pub use validation::{validate_config, ValidationError};
