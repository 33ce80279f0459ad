//! Registry, resolution, and service error types.

use std::fmt::Write as _;

use semver::{Version, VersionReq};
use thiserror::Error;
use vessel_core::{ManifestError, PluginIdentifier, PluginState};

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while registering candidate units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A unit with the same identifier is already registered. Fatal for
    /// startup; previously registered candidates are left untouched.
    #[error("a plugin with identifier '{0}' is already registered")]
    Duplicate(PluginIdentifier),

    /// The unit (or one of its expanded sub-units) carries an invalid
    /// manifest.
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

// =============================================================================
// Version Validation
// =============================================================================

/// Per-candidate version-validation failure. The candidate is dropped before
/// resolution; the failure is logged and the remaining candidates proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The host version does not satisfy the candidate's declared range.
    #[error("'{id}' requires server version {required}, but the host is {host}")]
    ServerVersion {
        /// The rejected candidate.
        id: PluginIdentifier,
        /// Declared host version range.
        required: VersionReq,
        /// Actual host version.
        host: Version,
    },

    /// A hard dependency is present but declares no version to check against.
    #[error("'{id}' requires '{dependency}' {required}, but it declares no version")]
    UnversionedDependency {
        /// The rejected candidate.
        id: PluginIdentifier,
        /// The dependency without a declared version.
        dependency: PluginIdentifier,
        /// Range the candidate asked for.
        required: VersionReq,
    },

    /// A hard dependency's declared version does not satisfy the range.
    #[error("'{id}' requires '{dependency}' {required}, found {actual}")]
    IncompatibleDependency {
        /// The rejected candidate.
        id: PluginIdentifier,
        /// The incompatible dependency.
        dependency: PluginIdentifier,
        /// Range the candidate asked for.
        required: VersionReq,
        /// Version the dependency actually declares.
        actual: Version,
    },
}

// =============================================================================
// Resolution Errors
// =============================================================================

/// Which declared relation could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// A hard dependency.
    Required,
    /// A load-before ordering target.
    LoadBefore,
}

/// One unresolved relation in a [`ResolveError::MissingRelations`] report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRelation {
    /// The declaring candidate.
    pub id: PluginIdentifier,
    /// Whether the relation is a hard dependency or a load-before target.
    pub kind: RelationKind,
    /// The absent target.
    pub target: PluginIdentifier,
    /// Range declared for the target.
    pub range: VersionReq,
}

/// One stuck node in a [`ResolveError::Cycle`] report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleNode {
    /// The candidate that could not be extracted.
    pub id: PluginIdentifier,
    /// Identifiers it is still waiting on.
    pub waiting_on: Vec<PluginIdentifier>,
}

/// Failure to produce a load order. Fatal for the entire setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Declared relations point at identifiers that are not registered.
    #[error("{}", render_missing(.0))]
    MissingRelations(Vec<MissingRelation>),

    /// The relation graph contains a cycle.
    #[error("{}", render_cycle(.0))]
    Cycle(Vec<CycleNode>),
}

fn render_missing(relations: &[MissingRelation]) -> String {
    let mut out = format!("{} unresolved plugin relation(s):", relations.len());
    for relation in relations {
        match relation.kind {
            RelationKind::Required => {
                let _ = write!(
                    out,
                    "\n  {} requires {} ({})",
                    relation.id, relation.target, relation.range
                );
            }
            RelationKind::LoadBefore => {
                let _ = write!(
                    out,
                    "\n  {} must load before {}, which is not registered",
                    relation.id, relation.target
                );
            }
        }
    }
    out
}

fn render_cycle(nodes: &[CycleNode]) -> String {
    let mut out = String::from("cyclic plugin dependencies detected:");
    for node in nodes {
        let _ = write!(out, "\n  {} is waiting on", node.id);
        for (i, target) in node.waiting_on.iter().enumerate() {
            let _ = write!(out, "{} {}", if i == 0 { "" } else { "," }, target);
        }
    }
    out
}

// =============================================================================
// Service Errors
// =============================================================================

/// Errors surfaced by the service façade.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The operation was invoked in a service state it does not accept.
    /// A programmer error; there is no internal recovery path.
    #[error("{operation} requires service state {expected}, but the service is {actual}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// Human-readable description of the accepted states.
        expected: &'static str,
        /// The state the service was actually in.
        actual: PluginState,
    },

    /// Candidate registration failed during service assembly.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The resolver could not produce a load order.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Lookup of a plugin that is not in the live map.
    #[error("no loaded plugin with identifier '{0}'")]
    UnknownPlugin(PluginIdentifier),
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> PluginIdentifier {
        s.parse().unwrap()
    }

    #[test]
    fn missing_report_lists_every_offender() {
        let err = ResolveError::MissingRelations(vec![
            MissingRelation {
                id: id("core:q"),
                kind: RelationKind::Required,
                target: id("core:missing"),
                range: ">=1.0.0".parse().unwrap(),
            },
            MissingRelation {
                id: id("core:early"),
                kind: RelationKind::LoadBefore,
                target: id("core:gone"),
                range: VersionReq::STAR,
            },
        ]);
        let report = err.to_string();
        assert!(report.contains("core:q requires core:missing"));
        assert!(report.contains("core:early must load before core:gone"));
    }

    #[test]
    fn cycle_report_names_waiting_nodes() {
        let err = ResolveError::Cycle(vec![
            CycleNode {
                id: id("core:p1"),
                waiting_on: vec![id("core:p2")],
            },
            CycleNode {
                id: id("core:p2"),
                waiting_on: vec![id("core:p1")],
            },
        ]);
        let report = err.to_string();
        assert!(report.contains("core:p1 is waiting on core:p2"));
        assert!(report.contains("core:p2 is waiting on core:p1"));
    }
}
