//! Declared plugin metadata.
//!
//! A [`PluginManifest`] is the immutable unit of declared metadata for one
//! plugin. The host's configuration layer produces manifests from JSON-like
//! documents (hence the camelCase external field names); once a manifest has
//! entered the candidate registry it is never modified. Sub-plugin
//! inheritance constructs a *derived* manifest instead of mutating a shared
//! one, so parent and child never alias the same relation maps.

use std::collections::BTreeMap;

use semver::{Version, VersionReq};
use serde::Deserialize;

use crate::error::ManifestError;
use crate::identifier::PluginIdentifier;

/// Immutable declared metadata for a plugin unit.
///
/// The relation maps are keyed by [`PluginIdentifier`] in canonical
/// `group:name` form:
///
/// - `dependencies`: hard relations; a missing or version-unsatisfied target
///   is fatal for this unit.
/// - `optional_dependencies`: influence load ordering only when the target is
///   actually registered.
/// - `load_before`: this unit is ordered before each listed target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginManifest {
    /// Identifier group component.
    pub group: String,
    /// Identifier name component. Must be non-empty.
    pub name: String,
    /// Declared semantic version. Required when another unit depends on this
    /// one.
    pub version: Option<Version>,
    /// Human-readable description. Not load-bearing.
    pub description: String,
    /// Project website. Not load-bearing.
    pub website: String,
    /// Authors. Not load-bearing.
    pub authors: Vec<String>,
    /// Opaque type descriptor resolved by the instance factory. `None` (or
    /// empty) means the unit has no entry point and cannot be instantiated.
    pub main: Option<String>,
    /// Version range the host must satisfy for this unit to load.
    pub server_version: Option<VersionReq>,
    /// Hard dependencies: identifier → accepted version range.
    pub dependencies: BTreeMap<PluginIdentifier, VersionReq>,
    /// Optional dependencies: identifier → accepted version range.
    pub optional_dependencies: BTreeMap<PluginIdentifier, VersionReq>,
    /// Units this one must be ordered before.
    pub load_before: BTreeMap<PluginIdentifier, VersionReq>,
    /// Child manifests expanded into sibling candidates at registration.
    pub sub_plugins: Vec<PluginManifest>,
    /// Registered as available but not loaded at boot.
    pub disabled_by_default: bool,
    /// Informational flag for the asset-pack collaborator.
    pub includes_asset_pack: bool,
    /// Unit ships inside the host binary. Core units always order before
    /// externally discovered units.
    #[serde(rename = "inServerClasspath")]
    pub in_server_classpath: bool,
}

impl PluginManifest {
    /// The identifier formed by this manifest's group and name.
    ///
    /// # Errors
    ///
    /// Fails when either component is empty (a sub-manifest before
    /// inheritance, or a malformed document).
    pub fn identifier(&self) -> Result<PluginIdentifier, ManifestError> {
        if self.name.is_empty() {
            return Err(ManifestError::MissingName);
        }
        Ok(PluginIdentifier::new(&self.group, &self.name)?)
    }

    /// Checks the manifest's structural invariants: a non-empty name and
    /// disjoint hard/optional dependency maps.
    pub fn validate(&self) -> Result<(), ManifestError> {
        let id = self.identifier()?;
        for dependency in self.dependencies.keys() {
            if self.optional_dependencies.contains_key(dependency) {
                return Err(ManifestError::OverlappingDependency {
                    id,
                    dependency: dependency.clone(),
                });
            }
        }
        Ok(())
    }

    /// Constructs the derived manifest for a sub-plugin declared under
    /// `parent`.
    ///
    /// Empty fields are populated from the parent: group, version,
    /// description, website, authors (when empty), and `disabled_by_default`
    /// (only when the child's own flag is false). The child also gains an
    /// implicit hard dependency on the parent's identifier, pinned to the
    /// parent's exact version, or the wildcard range when the parent declares
    /// none.
    ///
    /// This is the only permitted derivation of a manifest; the parent is
    /// never touched.
    pub fn inherit_from(&self, parent: &PluginManifest) -> PluginManifest {
        let mut child = self.clone();
        if child.group.is_empty() {
            child.group = parent.group.clone();
        }
        if child.version.is_none() {
            child.version = parent.version.clone();
        }
        if child.description.is_empty() {
            child.description = parent.description.clone();
        }
        if child.website.is_empty() {
            child.website = parent.website.clone();
        }
        if child.authors.is_empty() {
            child.authors = parent.authors.clone();
        }
        if !child.disabled_by_default {
            child.disabled_by_default = parent.disabled_by_default;
        }
        if let Ok(parent_id) = parent.identifier() {
            let range = parent
                .version
                .as_ref()
                .and_then(|v| VersionReq::parse(&format!("={v}")).ok())
                .unwrap_or(VersionReq::STAR);
            child.dependencies.entry(parent_id).or_insert(range);
        }
        child
    }
}
