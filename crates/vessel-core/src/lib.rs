//! # Vessel Core
//!
//! Data model and contracts for the Vessel plugin host.
//!
//! This crate defines everything the lifecycle engine in `vessel-plugins`
//! operates on, without any lifecycle logic of its own:
//!
//! - **Identity**: [`PluginIdentifier`], the `group:name` pair keying every
//!   map in the system.
//! - **Declared metadata**: [`PluginManifest`] (immutable after
//!   registration) and [`CandidateUnit`], a validated manifest plus its
//!   origin, including sub-plugin expansion with field inheritance.
//! - **Lifecycle states**: [`PluginState`], the integer-ordered enumeration
//!   shared by plugin instances and the service itself.
//! - **Behaviour contracts**: the async [`Plugin`] hook trait and the
//!   [`PluginFactory`] instance-construction interface with its in-binary
//!   [`StaticPluginFactory`] implementation.
//!
//! Manifests deserialize from the host's JSON-like documents via `serde`;
//! versions and ranges are `semver` types throughout.

pub mod candidate;
pub mod error;
pub mod identifier;
pub mod manifest;
pub mod plugin;
pub mod state;

pub use candidate::CandidateUnit;
pub use error::{FactoryError, IdentifierError, ManifestError};
pub use identifier::PluginIdentifier;
pub use manifest::PluginManifest;
pub use plugin::{
    BoxError, Plugin, PluginContext, PluginFactory, PluginResult, StaticPluginFactory,
};
pub use state::PluginState;

// Re-exported so downstream crates spell version types the same way.
pub use semver::{Version, VersionReq};
