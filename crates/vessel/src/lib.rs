//! # Vessel
//!
//! A plugin lifecycle and dependency-resolution host for long-running
//! servers.
//!
//! ## Overview
//!
//! The host declares a set of plugin units, each carrying a manifest.
//! Vessel validates them, computes a deterministic load order that honors
//! declared relations (hard and optional dependencies, load-before
//! constraints, core-before-external partitioning), instantiates each unit,
//! and drives every instance through a strict lifecycle:
//!
//! ```text
//! None ──► Setup ──► Start ──► Enabled ──► Shutdown ──► Disabled
//! ```
//!
//! One plugin's failure never corrupts the service: faulty instances are
//! disabled, stopped, and removed while their peers continue.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use vessel::prelude::*;
//!
//! struct WorldPlugin;
//!
//! #[async_trait::async_trait]
//! impl Plugin for WorldPlugin {
//!     async fn setup(&mut self, ctx: &PluginContext) -> PluginResult<()> {
//!         tracing::info!("setting up {}", ctx.id());
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = HostConfig::load()?;
//!     let _guard = LoggingBuilder::new().directive(&config.log_level).init();
//!
//!     let factory = StaticPluginFactory::new()
//!         .with("world.Plugin", || Box::new(WorldPlugin));
//!     let manifest: PluginManifest = serde_json::from_str(WORLD_MANIFEST)?;
//!
//!     let host = Host::new(
//!         config.server_version,
//!         std::sync::Arc::new(factory),
//!         vec![CandidateUnit::core(manifest)?],
//!     )?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Runtime operations
//!
//! While the host is running, individual plugins can be inspected and
//! cycled: [`PluginService::load`], [`PluginService::unload`] (refused while
//! enabled dependents exist), [`PluginService::reload`], and the query
//! family ([`PluginService::get_plugin`], [`PluginService::has_plugin`]).
//!
//! [`PluginService::load`]: vessel_plugins::PluginService::load
//! [`PluginService::unload`]: vessel_plugins::PluginService::unload
//! [`PluginService::reload`]: vessel_plugins::PluginService::reload
//! [`PluginService::get_plugin`]: vessel_plugins::PluginService::get_plugin
//! [`PluginService::has_plugin`]: vessel_plugins::PluginService::has_plugin

// Data model and contracts
pub use vessel_core::*;

// Lifecycle engine
pub use vessel_plugins;

// Host orchestration
pub use vessel_runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use vessel::prelude::*;
/// ```
pub mod prelude {
    // Host entry points
    pub use vessel_runtime::{Host, HostConfig, LoggingBuilder};

    // Service façade and live handles
    pub use vessel_plugins::{PluginHandle, PluginService, ServiceError};

    // Plugin authoring
    pub use vessel_core::{
        Plugin, PluginContext, PluginFactory, PluginResult, StaticPluginFactory,
    };

    // Model types
    pub use vessel_core::{
        CandidateUnit, PluginIdentifier, PluginManifest, PluginState, Version, VersionReq,
    };
}
