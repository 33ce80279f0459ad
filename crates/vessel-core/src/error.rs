//! Error types for the Vessel core data model.
//!
//! Lifecycle and resolution errors live in `vessel-plugins`; this module only
//! covers the model itself (identifiers, manifests, instance construction).

use thiserror::Error;

use crate::identifier::PluginIdentifier;

// =============================================================================
// Identifier Errors
// =============================================================================

/// Errors produced while constructing or parsing a [`PluginIdentifier`].
///
/// [`PluginIdentifier`]: crate::identifier::PluginIdentifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// The textual form was empty.
    #[error("plugin identifier must not be empty")]
    Empty,

    /// A group or name component was empty.
    #[error("plugin identifier components must not be empty")]
    EmptyComponent,

    /// The textual form did not split into exactly `group:name`.
    #[error("malformed plugin identifier '{0}', expected exactly 'group:name'")]
    Malformed(String),
}

// =============================================================================
// Manifest Errors
// =============================================================================

/// Errors raised when a declared manifest violates a structural invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// Every manifest must carry a non-empty name.
    #[error("plugin manifest is missing a name")]
    MissingName,

    /// The group/name pair could not form an identifier.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    /// A relation appears in both the required and the optional dependency map.
    #[error("'{id}' declares '{dependency}' as both a required and an optional dependency")]
    OverlappingDependency {
        /// The declaring plugin.
        id: PluginIdentifier,
        /// The doubly-declared relation target.
        dependency: PluginIdentifier,
    },

    /// A sub-manifest resolved to the same identifier as its parent.
    #[error("sub-plugin of '{parent}' resolves to the parent's own identifier")]
    SubPluginIdentifier {
        /// The parent plugin.
        parent: PluginIdentifier,
    },
}

// =============================================================================
// Factory Errors
// =============================================================================

/// Errors returned by a [`PluginFactory`] when an instance cannot be built.
///
/// [`PluginFactory`]: crate::plugin::PluginFactory
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The manifest declares no `main` entry point and cannot be instantiated.
    #[error("plugin '{plugin}' declares no entry point")]
    NoEntryPoint {
        /// Name of the plugin without a `main` descriptor.
        plugin: String,
    },

    /// No constructor is registered for the manifest's `main` descriptor.
    #[error("no constructor registered for descriptor '{descriptor}'")]
    UnknownDescriptor {
        /// The unresolvable type descriptor.
        descriptor: String,
    },
}
