//! Candidate registry.
//!
//! Collects [`CandidateUnit`]s awaiting load. Registration of a parent unit
//! recursively registers its expanded sub-unit candidates, so by the time the
//! service drains the registry every declared unit — at any nesting depth —
//! is present under its own identifier.

use std::collections::BTreeMap;

use tracing::debug;
use vessel_core::{CandidateUnit, PluginIdentifier};

use crate::error::RegistryError;

/// Registry of candidate units awaiting load, keyed by identifier.
///
/// The backing map is ordered by identifier, which is what makes the
/// resolver's tie-breaking stable across runs.
#[derive(Debug, Default)]
pub struct CandidateRegistry {
    units: BTreeMap<PluginIdentifier, CandidateUnit>,
}

impl CandidateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered candidates.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Whether a candidate with `id` is registered.
    pub fn contains(&self, id: &PluginIdentifier) -> bool {
        self.units.contains_key(id)
    }

    /// Registers a unit and, recursively, its expanded sub-unit candidates.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate identifier or an invalid (sub-)manifest. The
    /// failure is fatal for the offending unit only: candidates registered
    /// before the failure — including this unit's earlier siblings and the
    /// unit itself when a sub-unit is the offender — remain registered.
    pub fn register(&mut self, unit: CandidateUnit) -> Result<(), RegistryError> {
        let id = unit.id().clone();
        if self.units.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let children = unit.expand()?;
        debug!(plugin = %id, core = unit.is_core(), "candidate registered");
        self.units.insert(id, unit);
        for child in children {
            self.register(child)?;
        }
        Ok(())
    }

    /// Hands the full candidate set to the service. Called once at setup;
    /// the registry is empty afterwards.
    pub fn drain(&mut self) -> BTreeMap<PluginIdentifier, CandidateUnit> {
        std::mem::take(&mut self.units)
    }
}
