//! # Vessel Runtime
//!
//! Host-facing orchestration layer for the Vessel plugin host.
//!
//! The plugin core (`vessel-plugins`) is deliberately blind to process
//! concerns; this crate supplies them:
//!
//! - [`LoggingBuilder`]: one `tracing` subscriber for the process, with
//!   `RUST_LOG` filtering and optional file output.
//! - [`HostConfig`]: the host's own settings (advertised server version,
//!   logging), loaded from `vessel.toml` plus `VESSEL_` environment
//!   overrides.
//! - [`Host`]: the run loop — boot the service, wait for Ctrl+C/SIGTERM,
//!   shut down in order.

pub mod config;
pub mod host;
pub mod logging;

pub use config::{ConfigError, ConfigResult, HostConfig};
pub use host::Host;
pub use logging::LoggingBuilder;
