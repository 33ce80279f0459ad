//! Dependency resolution.
//!
//! Two pure functions over the candidate map:
//!
//! - [`validate_candidates`] drops candidates whose declared version
//!   constraints cannot be met (host version, dependency versions). Dropping
//!   is per-candidate; the survivors proceed.
//! - [`resolve`] turns the surviving candidates into a load order, or fails
//!   with a composite report. Missing hard dependencies and missing
//!   load-before targets are collected here and are fatal for the entire
//!   setup, as is a relation cycle.
//!
//! Both functions keep no state and hold no locks; the service owns all
//! shared data. The candidate map is ordered by identifier, and extraction
//! within a resolution pass follows that order, so identical input always
//! yields an identical load order.

use std::collections::{BTreeMap, BTreeSet};

use semver::Version;
use vessel_core::{CandidateUnit, PluginIdentifier};

use crate::error::{CycleNode, MissingRelation, RelationKind, ResolveError, ValidationError};

/// Checks every candidate's version constraints and removes the failures
/// from the map, returning one diagnostic per dropped candidate.
///
/// For each candidate:
/// - a declared `server_version` range must be satisfied by `host_version`;
/// - each hard dependency found in the pending map or in `loaded` (the
///   versions of already-live instances) must declare a version satisfying
///   the candidate's range.
///
/// A hard dependency found in neither place is *not* a validation failure:
/// wholly absent targets are reported by [`resolve`], where they abort the
/// whole setup instead of silently dropping the declaring candidate.
pub fn validate_candidates(
    candidates: &mut BTreeMap<PluginIdentifier, CandidateUnit>,
    host_version: &Version,
    loaded: &BTreeMap<PluginIdentifier, Option<Version>>,
) -> Vec<ValidationError> {
    let mut failures = Vec::new();
    let ids: Vec<PluginIdentifier> = candidates.keys().cloned().collect();

    for id in ids {
        let Some(unit) = candidates.get(&id) else {
            continue;
        };
        let manifest = unit.manifest();

        let mut failure = None;
        if let Some(required) = &manifest.server_version
            && !required.matches(host_version)
        {
            failure = Some(ValidationError::ServerVersion {
                id: id.clone(),
                required: required.clone(),
                host: host_version.clone(),
            });
        }

        if failure.is_none() {
            for (dependency, required) in &manifest.dependencies {
                let declared = match candidates.get(dependency) {
                    Some(dep) => dep.manifest().version.as_ref(),
                    None => match loaded.get(dependency) {
                        Some(version) => version.as_ref(),
                        None => continue,
                    },
                };
                match declared {
                    None => {
                        failure = Some(ValidationError::UnversionedDependency {
                            id: id.clone(),
                            dependency: dependency.clone(),
                            required: required.clone(),
                        });
                        break;
                    }
                    Some(version) if !required.matches(version) => {
                        failure = Some(ValidationError::IncompatibleDependency {
                            id: id.clone(),
                            dependency: dependency.clone(),
                            required: required.clone(),
                            actual: version.clone(),
                        });
                        break;
                    }
                    Some(_) => {}
                }
            }
        }

        if let Some(failure) = failure {
            candidates.remove(&id);
            failures.push(failure);
        }
    }

    failures
}

/// Produces the load order for `candidates`, or a structured failure.
///
/// Ordering constraints, expressed as incoming-requirement edges:
/// - each registered hard or optional dependency of a unit must come first;
/// - each `load_before` declaration flips: the declaring unit becomes a
///   requirement of its target;
/// - every core unit comes before every non-core unit.
///
/// Relations pointing at unregistered identifiers are fatal — hard
/// dependencies and load-before targets alike — and are reported together in
/// one composite diagnostic. Optional dependencies influence ordering only
/// when the target is present.
///
/// An empty input yields an empty order.
pub fn resolve(
    candidates: BTreeMap<PluginIdentifier, CandidateUnit>,
) -> Result<Vec<CandidateUnit>, ResolveError> {
    let mut missing = Vec::new();
    let mut edges: BTreeMap<PluginIdentifier, BTreeSet<PluginIdentifier>> = BTreeMap::new();

    let core_ids: Vec<PluginIdentifier> = candidates
        .values()
        .filter(|unit| unit.is_core())
        .map(|unit| unit.id().clone())
        .collect();

    for (id, unit) in &candidates {
        let manifest = unit.manifest();
        let mut incoming = BTreeSet::new();

        for (target, range) in &manifest.dependencies {
            if candidates.contains_key(target) {
                incoming.insert(target.clone());
            } else {
                missing.push(MissingRelation {
                    id: id.clone(),
                    kind: RelationKind::Required,
                    target: target.clone(),
                    range: range.clone(),
                });
            }
        }
        for target in manifest.optional_dependencies.keys() {
            if candidates.contains_key(target) {
                incoming.insert(target.clone());
            }
        }
        if !unit.is_core() {
            incoming.extend(core_ids.iter().cloned());
        }
        incoming.remove(id);

        edges.insert(id.clone(), incoming);
    }

    // Flipped pass: a load-before declaration is an edge of its target.
    for (id, unit) in &candidates {
        for (target, range) in &unit.manifest().load_before {
            if target == id {
                continue;
            }
            match edges.get_mut(target) {
                Some(incoming) => {
                    incoming.insert(id.clone());
                }
                None => missing.push(MissingRelation {
                    id: id.clone(),
                    kind: RelationKind::LoadBefore,
                    target: target.clone(),
                    range: range.clone(),
                }),
            }
        }
    }

    if !missing.is_empty() {
        return Err(ResolveError::MissingRelations(missing));
    }

    let mut remaining = candidates;
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready: Vec<PluginIdentifier> = edges
            .iter()
            .filter(|(_, incoming)| incoming.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        if ready.is_empty() {
            let report = edges
                .iter()
                .map(|(id, incoming)| CycleNode {
                    id: id.clone(),
                    waiting_on: incoming.iter().cloned().collect(),
                })
                .collect();
            return Err(ResolveError::Cycle(report));
        }

        for id in ready {
            edges.remove(&id);
            for incoming in edges.values_mut() {
                incoming.remove(&id);
            }
            if let Some(unit) = remaining.remove(&id) {
                order.push(unit);
            }
        }
    }

    Ok(order)
}
