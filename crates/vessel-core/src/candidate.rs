//! Candidate units awaiting load.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ManifestError;
use crate::identifier::PluginIdentifier;
use crate::manifest::PluginManifest;

/// A validated manifest plus its origin, registered before resolution.
///
/// Construction checks the manifest invariants once, so the identifier is
/// available infallibly afterwards. The resource path is empty for units
/// shipped inside the host binary; `is_core` segregates those units from
/// externally discovered ones during resolution.
#[derive(Debug, Clone)]
pub struct CandidateUnit {
    id: PluginIdentifier,
    manifest: Arc<PluginManifest>,
    path: PathBuf,
    is_core: bool,
}

impl CandidateUnit {
    /// Creates a candidate for an externally discovered unit.
    ///
    /// The core flag is taken from the manifest's classpath marker.
    ///
    /// # Errors
    ///
    /// Fails when the manifest violates a structural invariant.
    pub fn new(
        manifest: PluginManifest,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ManifestError> {
        let is_core = manifest.in_server_classpath;
        Self::with_origin(manifest, path.into(), is_core)
    }

    /// Creates a candidate for a unit shipped inside the host binary.
    pub fn core(manifest: PluginManifest) -> Result<Self, ManifestError> {
        Self::with_origin(manifest, PathBuf::new(), true)
    }

    fn with_origin(
        manifest: PluginManifest,
        path: PathBuf,
        is_core: bool,
    ) -> Result<Self, ManifestError> {
        manifest.validate()?;
        let id = manifest.identifier()?;
        Ok(Self {
            id,
            manifest: Arc::new(manifest),
            path,
            is_core,
        })
    }

    /// The unit's identifier.
    pub fn id(&self) -> &PluginIdentifier {
        &self.id
    }

    /// The declared manifest.
    pub fn manifest(&self) -> &Arc<PluginManifest> {
        &self.manifest
    }

    /// Resource path this unit was discovered at; empty for core units.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the unit ships inside the host binary.
    pub fn is_core(&self) -> bool {
        self.is_core
    }

    /// Expands this unit's declared sub-manifests into sibling candidates.
    ///
    /// One candidate per sub-manifest, single level: a child's own
    /// sub-manifests are expanded when the child itself is registered. Each
    /// child carries this unit's path and core flag and a derived manifest
    /// per [`PluginManifest::inherit_from`].
    ///
    /// # Errors
    ///
    /// Fails when a derived child manifest is invalid or collides with this
    /// unit's own identifier.
    pub fn expand(&self) -> Result<Vec<CandidateUnit>, ManifestError> {
        let mut children = Vec::with_capacity(self.manifest.sub_plugins.len());
        for sub in &self.manifest.sub_plugins {
            let derived = sub.inherit_from(&self.manifest);
            let child = Self::with_origin(derived, self.path.clone(), self.is_core)?;
            if child.id == self.id {
                return Err(ManifestError::SubPluginIdentifier {
                    parent: self.id.clone(),
                });
            }
            children.push(child);
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;

    fn manifest(group: &str, name: &str) -> PluginManifest {
        PluginManifest {
            group: group.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn core_unit_has_empty_path() {
        let unit = CandidateUnit::core(manifest("core", "world")).unwrap();
        assert!(unit.is_core());
        assert_eq!(unit.path(), Path::new(""));
    }

    #[test]
    fn external_unit_takes_core_flag_from_manifest() {
        let unit = CandidateUnit::new(manifest("mods", "extra"), "plugins/extra").unwrap();
        assert!(!unit.is_core());
        assert_eq!(unit.path(), Path::new("plugins/extra"));
    }

    #[test]
    fn expand_emits_one_candidate_per_sub_manifest() {
        let mut parent = manifest("core", "world");
        parent.version = Some(Version::new(1, 0, 0));
        parent.sub_plugins = vec![manifest("", "world-gen"), manifest("", "world-view")];

        let unit = CandidateUnit::core(parent).unwrap();
        let children = unit.expand().unwrap();
        assert_eq!(children.len(), 2);
        for child in &children {
            assert!(child.is_core());
            assert_eq!(child.id().group(), "core");
            assert!(
                child
                    .manifest()
                    .dependencies
                    .contains_key(&"core:world".parse().unwrap())
            );
        }
    }

    #[test]
    fn expand_is_single_level() {
        let mut child = manifest("", "branch");
        child.sub_plugins = vec![manifest("", "leaf")];
        let mut parent = manifest("core", "trunk");
        parent.sub_plugins = vec![child];

        let unit = CandidateUnit::core(parent).unwrap();
        let children = unit.expand().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].manifest().sub_plugins.len(), 1);
    }

    #[test]
    fn expand_rejects_child_shadowing_parent() {
        let mut parent = manifest("core", "world");
        parent.sub_plugins = vec![manifest("core", "world")];
        let unit = CandidateUnit::core(parent).unwrap();
        assert!(matches!(
            unit.expand().unwrap_err(),
            ManifestError::SubPluginIdentifier { .. }
        ));
    }
}
