//! # Vessel Plugins
//!
//! Candidate registry, dependency resolver, and lifecycle engine for the
//! Vessel plugin host.
//!
//! ## Architecture
//!
//! The host hands a set of candidate units to the [`PluginService`] at
//! construction; everything else flows from there:
//!
//! ```text
//! CandidateRegistry ──drain──► validate_candidates ──► resolve
//!         │                                              │ load order
//!         ▼                                              ▼
//!   (sub-unit expansion)                      setup pass ─► start pass
//!                                                   │
//!                                             PluginHandle map
//!                                        (load / unload / reload / queries)
//! ```
//!
//! - [`CandidateRegistry`] collects units awaiting load and expands declared
//!   sub-units recursively.
//! - [`resolver`] is a pair of pure functions: version validation drops
//!   individual candidates, resolution produces a deterministic load order
//!   or a composite diagnostic (missing relations, cycles).
//! - [`PluginService`] drives every instance through the lifecycle state
//!   machine with per-stage dependency gating and strict fault isolation,
//!   and exposes the runtime API (`load`, `unload`, `reload`, queries).

pub mod error;
pub mod handle;
pub mod registry;
pub mod resolver;
pub mod service;

pub use error::{
    CycleNode, MissingRelation, RegistryError, RelationKind, ResolveError, ServiceError,
    ServiceResult, ValidationError,
};
pub use handle::PluginHandle;
pub use registry::CandidateRegistry;
pub use resolver::{resolve, validate_candidates};
pub use service::PluginService;
