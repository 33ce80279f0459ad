//! The plugin service: lifecycle engine and public façade.
//!
//! [`PluginService`] is the single long-lived owner of all plugin state. It:
//!
//! - Accepts candidate units at construction and drives them through
//!   `setup` → `start` in resolved dependency order, gating each transition
//!   on the states of the plugin's declared hard dependencies.
//! - Isolates faults: a hook error (or a hook observed cancelled) is logged,
//!   the plugin is disabled, its stop hook runs, and it is removed from the
//!   live map — nothing propagates to peer plugins or to the caller.
//! - Supports runtime `load` / `unload` / `reload` of individual plugins
//!   while the service is running.
//! - Tears down in reverse load order on `stop`, which always runs to
//!   completion.
//!
//! # Concurrency
//!
//! Lifecycle operations are mutually exclusive, serialized by one async
//! lock held for the duration of the operation (hooks may suspend under
//! it). Read-only queries never take that lock: the live map sits behind a
//! read-write lock with non-suspending critical sections, so queries observe
//! a snapshot-consistent view — an instance is either absent or present with
//! a current state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use vessel_core::{
    CandidateUnit, FactoryError, PluginFactory, PluginIdentifier, PluginState, Version, VersionReq,
};

use crate::error::{ServiceError, ServiceResult};
use crate::handle::PluginHandle;
use crate::registry::CandidateRegistry;
use crate::resolver::{resolve, validate_candidates};

/// Plugin lifecycle service.
///
/// See the [module docs](self) for the overall model. Construct with the
/// full set of candidate units (explicit registration — there is no ambient
/// discovery), then drive `setup` and `start` once, in that order.
pub struct PluginService {
    host_version: Version,
    factory: Arc<dyn PluginFactory>,
    registry: Mutex<CandidateRegistry>,
    /// All drained candidates, kept for runtime `load` (including units that
    /// were disabled by default at boot).
    available: Mutex<BTreeMap<PluginIdentifier, CandidateUnit>>,
    state: Mutex<PluginState>,
    /// Live instances keyed by identifier. Concurrent readers; written only
    /// inside lifecycle operations.
    plugins: RwLock<HashMap<PluginIdentifier, Arc<PluginHandle>>>,
    /// Serializes lifecycle operations. Never held by queries.
    op_lock: tokio::sync::Mutex<()>,
    /// Resolved boot order, consumed by the start pass and then discarded.
    boot_order: Mutex<Vec<PluginIdentifier>>,
    /// Cumulative instantiation order, reversed for shutdown.
    load_sequence: Mutex<Vec<PluginIdentifier>>,
}

impl PluginService {
    /// Creates the service with its full candidate set.
    ///
    /// Every unit (and its expanded sub-units) is registered immediately.
    ///
    /// # Errors
    ///
    /// Fails on a duplicate identifier or an invalid manifest — fatal for
    /// startup, with a diagnostic naming the offender.
    pub fn new(
        host_version: Version,
        factory: Arc<dyn PluginFactory>,
        candidates: Vec<CandidateUnit>,
    ) -> ServiceResult<Self> {
        let mut registry = CandidateRegistry::new();
        for unit in candidates {
            registry.register(unit)?;
        }
        Ok(Self {
            host_version,
            factory,
            registry: Mutex::new(registry),
            available: Mutex::new(BTreeMap::new()),
            state: Mutex::new(PluginState::None),
            plugins: RwLock::new(HashMap::new()),
            op_lock: tokio::sync::Mutex::new(()),
            boot_order: Mutex::new(Vec::new()),
            load_sequence: Mutex::new(Vec::new()),
        })
    }

    /// Current service-wide state.
    pub fn state(&self) -> PluginState {
        *self.state.lock()
    }

    // ─── Boot passes ─────────────────────────────────────────────────────────

    /// Drains the registry, resolves the load order, instantiates every
    /// bootable candidate, and runs the gated setup pass over the order.
    ///
    /// Units with `disabled_by_default` stay available for a later
    /// [`load`](Self::load) but never enter the boot order. Candidates that
    /// fail version validation are dropped with an error log. Instances
    /// whose setup hook fails (or whose dependencies are not in the required
    /// state) are disabled, stopped, and removed; the pass continues.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidState`] unless the service is in `None`;
    /// [`ServiceError::Resolve`] when the candidate set has missing or
    /// cyclic relations — no instance is created in that case.
    pub async fn setup(&self, cancel: CancellationToken) -> ServiceResult<()> {
        let _op = self.op_lock.lock().await;
        {
            let mut state = self.state.lock();
            if *state != PluginState::None {
                return Err(ServiceError::InvalidState {
                    operation: "setup",
                    expected: "None",
                    actual: *state,
                });
            }
            *state = PluginState::Setup;
        }

        let drained = self.registry.lock().drain();
        *self.available.lock() = drained.clone();

        let mut pending = BTreeMap::new();
        for (id, unit) in drained {
            if unit.manifest().disabled_by_default {
                debug!(plugin = %id, "disabled by default, not loading at boot");
            } else {
                pending.insert(id, unit);
            }
        }

        let loaded = self.loaded_versions();
        for failure in validate_candidates(&mut pending, &self.host_version, &loaded) {
            error!(error = %failure, "candidate dropped by version validation");
        }

        let order = resolve(pending)?;
        info!(count = order.len(), "plugin load order resolved");

        let mut boot = Vec::with_capacity(order.len());
        for unit in order {
            match self.instantiate(&unit) {
                Ok(handle) => {
                    let id = handle.id().clone();
                    self.plugins.write().insert(id.clone(), handle);
                    self.load_sequence.lock().push(id.clone());
                    boot.push(id);
                }
                Err(e) => {
                    error!(plugin = %unit.id(), error = %e, "failed to construct plugin instance");
                }
            }
        }

        for id in &boot {
            if let Some(handle) = self.try_get_plugin(id) {
                self.setup_instance(&handle, &cancel).await;
            }
        }

        *self.boot_order.lock() = boot;
        Ok(())
    }

    /// Runs the gated start pass over the order produced by
    /// [`setup`](Self::setup), then discards the cached order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidState`] unless the service is in `Setup`.
    pub async fn start(&self, cancel: CancellationToken) -> ServiceResult<()> {
        let _op = self.op_lock.lock().await;
        {
            let mut state = self.state.lock();
            if *state != PluginState::Setup {
                return Err(ServiceError::InvalidState {
                    operation: "start",
                    expected: "Setup",
                    actual: *state,
                });
            }
            *state = PluginState::Start;
        }

        let order = std::mem::take(&mut *self.boot_order.lock());
        for id in &order {
            if let Some(handle) = self.try_get_plugin(id) {
                self.start_instance(&handle, &cancel).await;
            }
        }

        info!(count = self.plugins.read().len(), "plugin start pass complete");
        Ok(())
    }

    /// Shuts the service down.
    ///
    /// Every live instance currently `Enabled` is driven through
    /// `Shutdown` → `Disabled` in reverse load order, then the live map is
    /// cleared. Stop is never cancelled and never fails; hook errors are
    /// logged and swallowed.
    pub async fn stop(&self) {
        let _op = self.op_lock.lock().await;
        *self.state.lock() = PluginState::Shutdown;

        let order: Vec<PluginIdentifier> = {
            let mut sequence = self.load_sequence.lock().clone();
            sequence.reverse();
            sequence
        };

        for id in &order {
            let handle = self.plugins.read().get(id).cloned();
            if let Some(handle) = handle
                && handle.state() == PluginState::Enabled
            {
                self.shutdown_instance(&handle).await;
            }
        }

        self.plugins.write().clear();
        self.load_sequence.lock().clear();
        self.boot_order.lock().clear();
        info!("all plugins unloaded");
    }

    // ─── Runtime load / unload ───────────────────────────────────────────────

    /// Loads a single registered candidate at runtime.
    ///
    /// Locates the candidate among the units registered at construction
    /// (runtime discovery of new units is a host concern). Returns `false`
    /// when no candidate matches, when version validation or construction
    /// fails, or when setup/start fail their hooks or dependency gates.
    /// Loading an identifier that is already live is a no-op returning
    /// `true`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidState`] unless the service has completed its
    /// own setup stage.
    pub async fn load(
        &self,
        id: &PluginIdentifier,
        cancel: CancellationToken,
    ) -> ServiceResult<bool> {
        let _op = self.op_lock.lock().await;
        self.require_running("load")?;
        Ok(self.load_locked(id, &cancel).await)
    }

    /// Unloads a single live plugin at runtime.
    ///
    /// Returns `false` (with a warning) when the plugin is absent or not
    /// `Enabled`, and when other `Enabled` plugins declare a hard dependency
    /// on it — dependents are never silently orphaned.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidState`] unless the service has completed its
    /// own setup stage.
    pub async fn unload(&self, id: &PluginIdentifier) -> ServiceResult<bool> {
        let _op = self.op_lock.lock().await;
        self.require_running("unload")?;
        Ok(self.unload_locked(id).await)
    }

    /// Unloads then re-loads a plugin under a single operation.
    ///
    /// Returns `true` only when both halves succeed.
    ///
    /// # Errors
    ///
    /// [`ServiceError::InvalidState`] unless the service has completed its
    /// own setup stage.
    pub async fn reload(
        &self,
        id: &PluginIdentifier,
        cancel: CancellationToken,
    ) -> ServiceResult<bool> {
        let _op = self.op_lock.lock().await;
        self.require_running("reload")?;
        let unloaded = self.unload_locked(id).await;
        Ok(unloaded && self.load_locked(id, &cancel).await)
    }

    async fn load_locked(&self, id: &PluginIdentifier, cancel: &CancellationToken) -> bool {
        if self.plugins.read().contains_key(id) {
            warn!(plugin = %id, "plugin is already loaded");
            return true;
        }
        let unit = self.available.lock().get(id).cloned();
        let Some(unit) = unit else {
            warn!(plugin = %id, "no registered candidate matches");
            return false;
        };

        let mut pending = BTreeMap::from([(id.clone(), unit)]);
        let loaded = self.loaded_versions();
        let failures = validate_candidates(&mut pending, &self.host_version, &loaded);
        if !failures.is_empty() {
            for failure in failures {
                error!(error = %failure, "candidate dropped by version validation");
            }
            return false;
        }
        let Some(unit) = pending.remove(id) else {
            return false;
        };

        let handle = match self.instantiate(&unit) {
            Ok(handle) => handle,
            Err(e) => {
                error!(plugin = %id, error = %e, "failed to construct plugin instance");
                return false;
            }
        };
        self.plugins.write().insert(id.clone(), Arc::clone(&handle));
        self.load_sequence.lock().push(id.clone());

        if !self.setup_instance(&handle, cancel).await {
            return false;
        }
        let started = self.start_instance(&handle, cancel).await;
        if started {
            info!(plugin = %id, "plugin loaded");
        }
        started
    }

    async fn unload_locked(&self, id: &PluginIdentifier) -> bool {
        let handle = self.plugins.read().get(id).cloned();
        let Some(handle) = handle else {
            warn!(plugin = %id, "plugin is not loaded");
            return false;
        };
        if handle.state() != PluginState::Enabled {
            warn!(plugin = %id, state = %handle.state(), "plugin is not enabled");
            return false;
        }

        let dependents: Vec<PluginIdentifier> = self
            .plugins
            .read()
            .values()
            .filter(|other| {
                other.id() != id
                    && other.state() == PluginState::Enabled
                    && other.manifest().dependencies.contains_key(id)
            })
            .map(|other| other.id().clone())
            .collect();
        if !dependents.is_empty() {
            error!(
                plugin = %id,
                dependents = ?dependents,
                "cannot unload, enabled plugins depend on it"
            );
            return false;
        }

        self.shutdown_instance(&handle).await;
        self.plugins.write().remove(id);
        self.load_sequence.lock().retain(|loaded| loaded != id);
        info!(plugin = %id, "plugin unloaded");
        true
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// All live plugin handles.
    pub fn plugins(&self) -> Vec<Arc<PluginHandle>> {
        self.plugins.read().values().cloned().collect()
    }

    /// The live plugin with `id`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UnknownPlugin`] when no live instance matches.
    pub fn get_plugin(&self, id: &PluginIdentifier) -> ServiceResult<Arc<PluginHandle>> {
        self.try_get_plugin(id)
            .ok_or_else(|| ServiceError::UnknownPlugin(id.clone()))
    }

    /// The live plugin with `id`, or `None`.
    pub fn try_get_plugin(&self, id: &PluginIdentifier) -> Option<Arc<PluginHandle>> {
        self.plugins.read().get(id).cloned()
    }

    /// Whether a live plugin with `id` exists and its declared version
    /// satisfies `range`. A version-less manifest only matches the wildcard
    /// range.
    pub fn has_plugin(&self, id: &PluginIdentifier, range: &VersionReq) -> bool {
        self.try_get_plugin(id)
            .is_some_and(|handle| match handle.version() {
                Some(version) => range.matches(version),
                None => *range == VersionReq::STAR,
            })
    }

    // ─── Lifecycle engine ────────────────────────────────────────────────────

    fn instantiate(&self, unit: &CandidateUnit) -> Result<Arc<PluginHandle>, FactoryError> {
        let plugin = self.factory.construct(unit.manifest())?;
        Ok(Arc::new(PluginHandle::new(
            unit.id().clone(),
            Arc::clone(unit.manifest()),
            plugin,
        )))
    }

    /// Runs the setup stage for one instance. On any failure the instance is
    /// disabled, stopped, and removed; returns whether it survived.
    async fn setup_instance(
        &self,
        handle: &Arc<PluginHandle>,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.dependencies_ready(handle, PluginState::Setup, "setup") {
            self.discard(handle).await;
            return false;
        }
        handle.set_state(PluginState::Setup);
        match handle.call_setup(cancel).await {
            Ok(()) if !cancel.is_cancelled() => {
                debug!(plugin = %handle.id(), "setup complete");
                true
            }
            Ok(()) => {
                warn!(plugin = %handle.id(), "setup cancelled");
                self.discard(handle).await;
                false
            }
            Err(e) => {
                error!(plugin = %handle.id(), error = %e, "setup hook failed");
                self.discard(handle).await;
                false
            }
        }
    }

    /// Runs the start stage for one instance. Mirrors
    /// [`setup_instance`](Self::setup_instance); success ends in `Enabled`.
    async fn start_instance(
        &self,
        handle: &Arc<PluginHandle>,
        cancel: &CancellationToken,
    ) -> bool {
        if !self.dependencies_ready(handle, PluginState::Enabled, "start") {
            self.discard(handle).await;
            return false;
        }
        handle.set_state(PluginState::Start);
        match handle.call_start(cancel).await {
            Ok(()) if !cancel.is_cancelled() => {
                handle.set_state(PluginState::Enabled);
                info!(plugin = %handle.id(), "plugin enabled");
                true
            }
            Ok(()) => {
                warn!(plugin = %handle.id(), "start cancelled");
                self.discard(handle).await;
                false
            }
            Err(e) => {
                error!(plugin = %handle.id(), error = %e, "start hook failed");
                self.discard(handle).await;
                false
            }
        }
    }

    /// Checks that every hard dependency of `handle` is live and has reached
    /// `required`. Does not suspend.
    fn dependencies_ready(
        &self,
        handle: &PluginHandle,
        required: PluginState,
        stage: &'static str,
    ) -> bool {
        let plugins = self.plugins.read();
        for dependency in handle.manifest().dependencies.keys() {
            match plugins.get(dependency) {
                Some(dep) if dep.state() >= required => {}
                Some(dep) => {
                    error!(
                        plugin = %handle.id(),
                        dependency = %dependency,
                        stage,
                        expected = %required,
                        actual = %dep.state(),
                        "dependency has not reached the state required by this stage"
                    );
                    return false;
                }
                None => {
                    error!(
                        plugin = %handle.id(),
                        dependency = %dependency,
                        stage,
                        expected = %required,
                        "dependency is not loaded"
                    );
                    return false;
                }
            }
        }
        true
    }

    /// Drives one instance through `Shutdown` → `Disabled`. The stop hook
    /// receives a token that never fires; its errors are logged only.
    async fn shutdown_instance(&self, handle: &Arc<PluginHandle>) {
        handle.set_state(PluginState::Shutdown);
        if let Err(e) = handle.call_stop(&CancellationToken::new()).await {
            error!(plugin = %handle.id(), error = %e, "stop hook failed");
        }
        handle.set_state(PluginState::Disabled);
    }

    /// Fault path: disable, stop, and remove one instance.
    async fn discard(&self, handle: &Arc<PluginHandle>) {
        self.shutdown_instance(handle).await;
        self.plugins.write().remove(handle.id());
        self.load_sequence.lock().retain(|id| id != handle.id());
    }

    fn loaded_versions(&self) -> BTreeMap<PluginIdentifier, Option<Version>> {
        self.plugins
            .read()
            .iter()
            .map(|(id, handle)| (id.clone(), handle.version().cloned()))
            .collect()
    }

    fn require_running(&self, operation: &'static str) -> ServiceResult<()> {
        let state = self.state();
        if state.is_enabled() {
            Ok(())
        } else {
            Err(ServiceError::InvalidState {
                operation,
                expected: "Setup, Start or Enabled",
                actual: state,
            })
        }
    }
}

impl std::fmt::Debug for PluginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginService")
            .field("state", &self.state())
            .field("live", &self.plugins.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vessel_core::{Plugin, PluginContext, PluginManifest, PluginResult, StaticPluginFactory};

    type Journal = Arc<Mutex<Vec<String>>>;

    #[derive(Debug, Default, Clone, Copy)]
    struct Faults {
        setup: bool,
        start: bool,
        stop: bool,
    }

    struct ScriptedPlugin {
        journal: Journal,
        faults: Faults,
    }

    #[async_trait]
    impl Plugin for ScriptedPlugin {
        async fn setup(&mut self, ctx: &PluginContext) -> PluginResult<()> {
            self.journal.lock().push(format!("setup {}", ctx.id()));
            if self.faults.setup {
                return Err("injected setup fault".into());
            }
            Ok(())
        }

        async fn start(&mut self, ctx: &PluginContext) -> PluginResult<()> {
            self.journal.lock().push(format!("start {}", ctx.id()));
            if self.faults.start {
                return Err("injected start fault".into());
            }
            Ok(())
        }

        async fn stop(&mut self, ctx: &PluginContext) -> PluginResult<()> {
            self.journal.lock().push(format!("stop {}", ctx.id()));
            if self.faults.stop {
                return Err("injected stop fault".into());
            }
            Ok(())
        }
    }

    fn manifest(name: &str, version: &str) -> PluginManifest {
        PluginManifest {
            group: "core".into(),
            name: name.into(),
            version: Some(Version::parse(version).unwrap()),
            main: Some(format!("test.{name}")),
            ..Default::default()
        }
    }

    fn with_dep(mut m: PluginManifest, target: &str, range: &str) -> PluginManifest {
        m.dependencies
            .insert(target.parse().unwrap(), VersionReq::parse(range).unwrap());
        m
    }

    fn id(s: &str) -> PluginIdentifier {
        s.parse().unwrap()
    }

    struct Harness {
        journal: Journal,
        factory: StaticPluginFactory,
        units: Vec<CandidateUnit>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                journal: Journal::default(),
                factory: StaticPluginFactory::new(),
                units: Vec::new(),
            }
        }

        fn plugin(&mut self, m: PluginManifest, faults: Faults) -> &mut Self {
            let descriptor = m.main.clone().unwrap();
            let journal = Arc::clone(&self.journal);
            self.factory.register(descriptor, move || {
                Box::new(ScriptedPlugin {
                    journal: Arc::clone(&journal),
                    faults,
                })
            });
            self.units.push(CandidateUnit::core(m).unwrap());
            self
        }

        fn build(self) -> (PluginService, Journal) {
            let service = PluginService::new(
                Version::new(2, 0, 0),
                Arc::new(self.factory),
                self.units,
            )
            .unwrap();
            (service, self.journal)
        }

        async fn boot(self) -> (PluginService, Journal) {
            let (service, journal) = self.build();
            service.setup(CancellationToken::new()).await.unwrap();
            service.start(CancellationToken::new()).await.unwrap();
            (service, journal)
        }
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().clone()
    }

    #[test]
    fn duplicate_candidate_aborts_service_assembly() {
        let units = vec![
            CandidateUnit::core(manifest("a", "1.0.0")).unwrap(),
            CandidateUnit::core(manifest("a", "1.0.0")).unwrap(),
        ];
        let err = PluginService::new(
            Version::new(2, 0, 0),
            Arc::new(StaticPluginFactory::new()),
            units,
        )
        .unwrap_err();
        assert!(err.to_string().contains("core:a"));
    }

    #[tokio::test]
    async fn linear_chain_boots_to_enabled() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default())
            .plugin(
                with_dep(manifest("b", "1.0.0"), "core:a", ">=1.0.0"),
                Faults::default(),
            )
            .plugin(
                with_dep(manifest("c", "1.0.0"), "core:b", ">=1.0.0"),
                Faults::default(),
            );
        let (service, journal) = h.boot().await;

        for name in ["core:a", "core:b", "core:c"] {
            assert_eq!(
                service.get_plugin(&id(name)).unwrap().state(),
                PluginState::Enabled
            );
        }
        assert_eq!(service.state(), PluginState::Start);
        assert_eq!(
            entries(&journal),
            [
                "setup core:a",
                "setup core:b",
                "setup core:c",
                "start core:a",
                "start core:b",
                "start core:c",
            ]
        );
    }

    #[tokio::test]
    async fn setup_leaves_plugins_in_setup_state() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.build();
        service.setup(CancellationToken::new()).await.unwrap();

        assert_eq!(service.state(), PluginState::Setup);
        assert_eq!(
            service.get_plugin(&id("core:a")).unwrap().state(),
            PluginState::Setup
        );
    }

    #[tokio::test]
    async fn missing_optional_dependency_is_not_fatal() {
        let mut y = manifest("y", "1.0.0");
        y.optional_dependencies
            .insert(id("core:x"), VersionReq::STAR);
        let mut h = Harness::new();
        h.plugin(y, Faults::default());
        let (service, _) = h.boot().await;

        assert_eq!(
            service.get_plugin(&id("core:y")).unwrap().state(),
            PluginState::Enabled
        );
    }

    #[tokio::test]
    async fn cyclic_dependencies_abort_setup() {
        let mut h = Harness::new();
        h.plugin(
            with_dep(manifest("p1", "1.0.0"), "core:p2", "*"),
            Faults::default(),
        )
        .plugin(
            with_dep(manifest("p2", "1.0.0"), "core:p1", "*"),
            Faults::default(),
        );
        let (service, journal) = h.build();

        let err = service.setup(CancellationToken::new()).await.unwrap_err();
        let report = err.to_string();
        assert!(report.contains("core:p1"));
        assert!(report.contains("core:p2"));
        assert!(service.plugins().is_empty());
        assert!(entries(&journal).is_empty());
    }

    #[tokio::test]
    async fn missing_required_dependency_aborts_setup() {
        let mut h = Harness::new();
        h.plugin(
            with_dep(manifest("q", "1.0.0"), "core:missing", ">=1.0.0"),
            Faults::default(),
        );
        let (service, _) = h.build();

        let err = service.setup(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("core:q requires core:missing"));
        assert!(service.plugins().is_empty());
    }

    #[tokio::test]
    async fn setup_fault_is_isolated() {
        let mut h = Harness::new();
        h.plugin(manifest("good", "1.0.0"), Faults::default()).plugin(
            manifest("bad", "1.0.0"),
            Faults {
                setup: true,
                ..Faults::default()
            },
        );
        let (service, journal) = h.boot().await;

        assert_eq!(
            service.get_plugin(&id("core:good")).unwrap().state(),
            PluginState::Enabled
        );
        assert!(service.try_get_plugin(&id("core:bad")).is_none());
        assert_eq!(service.state(), PluginState::Start);
        // The faulty plugin was stopped on the way out.
        assert!(entries(&journal).contains(&"stop core:bad".to_string()));
    }

    #[tokio::test]
    async fn dependent_of_failed_plugin_is_gated_out() {
        let mut h = Harness::new();
        h.plugin(
            manifest("bad", "1.0.0"),
            Faults {
                setup: true,
                ..Faults::default()
            },
        )
        .plugin(
            with_dep(manifest("leaf", "1.0.0"), "core:bad", "*"),
            Faults::default(),
        );
        let (service, journal) = h.boot().await;

        assert!(service.plugins().is_empty());
        // The dependent never ran its setup hook.
        assert!(!entries(&journal).contains(&"setup core:leaf".to_string()));
    }

    #[tokio::test]
    async fn start_fault_is_isolated() {
        let mut h = Harness::new();
        h.plugin(manifest("good", "1.0.0"), Faults::default()).plugin(
            manifest("flaky", "1.0.0"),
            Faults {
                start: true,
                ..Faults::default()
            },
        );
        let (service, _) = h.boot().await;

        assert_eq!(
            service.get_plugin(&id("core:good")).unwrap().state(),
            PluginState::Enabled
        );
        assert!(service.try_get_plugin(&id("core:flaky")).is_none());
    }

    #[tokio::test]
    async fn cancelled_setup_disables_the_plugin() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.build();

        let cancel = CancellationToken::new();
        cancel.cancel();
        service.setup(cancel).await.unwrap();

        assert_eq!(service.state(), PluginState::Setup);
        assert!(service.plugins().is_empty());
    }

    #[tokio::test]
    async fn disabled_by_default_is_skipped_at_boot_but_loadable() {
        let mut dormant = manifest("dormant", "1.0.0");
        dormant.disabled_by_default = true;
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default())
            .plugin(dormant, Faults::default());
        let (service, _) = h.boot().await;

        assert!(service.try_get_plugin(&id("core:dormant")).is_none());

        let loaded = service
            .load(&id("core:dormant"), CancellationToken::new())
            .await
            .unwrap();
        assert!(loaded);
        assert_eq!(
            service.get_plugin(&id("core:dormant")).unwrap().state(),
            PluginState::Enabled
        );
    }

    #[tokio::test]
    async fn load_of_unknown_candidate_returns_false() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.boot().await;

        let loaded = service
            .load(&id("core:ghost"), CancellationToken::new())
            .await
            .unwrap();
        assert!(!loaded);
    }

    #[tokio::test]
    async fn load_is_idempotent_for_live_plugins() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, journal) = h.boot().await;

        let before = entries(&journal).len();
        let loaded = service
            .load(&id("core:a"), CancellationToken::new())
            .await
            .unwrap();
        assert!(loaded);
        assert_eq!(entries(&journal).len(), before);
    }

    #[tokio::test]
    async fn unload_rejects_while_dependents_are_enabled() {
        let mut h = Harness::new();
        h.plugin(manifest("base", "1.0.0"), Faults::default()).plugin(
            with_dep(manifest("user", "1.0.0"), "core:base", ">=1.0.0"),
            Faults::default(),
        );
        let (service, _) = h.boot().await;

        assert!(!service.unload(&id("core:base")).await.unwrap());
        assert_eq!(
            service.get_plugin(&id("core:base")).unwrap().state(),
            PluginState::Enabled
        );

        // Unloading the dependent first makes the base unloadable.
        assert!(service.unload(&id("core:user")).await.unwrap());
        assert!(service.unload(&id("core:base")).await.unwrap());
        assert!(service.plugins().is_empty());
    }

    #[tokio::test]
    async fn unload_of_absent_plugin_returns_false() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.boot().await;

        assert!(!service.unload(&id("core:ghost")).await.unwrap());
    }

    #[tokio::test]
    async fn unload_before_start_returns_false() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.build();
        service.setup(CancellationToken::new()).await.unwrap();

        // Still in Setup, not Enabled.
        assert!(!service.unload(&id("core:a")).await.unwrap());
        assert!(service.try_get_plugin(&id("core:a")).is_some());
    }

    #[tokio::test]
    async fn reload_runs_a_full_cycle() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, journal) = h.boot().await;

        let reloaded = service
            .reload(&id("core:a"), CancellationToken::new())
            .await
            .unwrap();
        assert!(reloaded);
        assert_eq!(
            service.get_plugin(&id("core:a")).unwrap().state(),
            PluginState::Enabled
        );
        assert_eq!(
            entries(&journal),
            [
                "setup core:a",
                "start core:a",
                "stop core:a",
                "setup core:a",
                "start core:a",
            ]
        );
    }

    #[tokio::test]
    async fn reload_of_absent_plugin_returns_false() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.boot().await;

        assert!(
            !service
                .reload(&id("core:ghost"), CancellationToken::new())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn stop_clears_the_live_map_in_reverse_load_order() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default())
            .plugin(
                with_dep(manifest("b", "1.0.0"), "core:a", ">=1.0.0"),
                Faults::default(),
            )
            .plugin(
                manifest("careless", "1.0.0"),
                Faults {
                    stop: true,
                    ..Faults::default()
                },
            );
        let (service, journal) = h.boot().await;

        service.stop().await;

        assert_eq!(service.state(), PluginState::Shutdown);
        assert!(service.plugins().is_empty());
        let stops: Vec<String> = entries(&journal)
            .into_iter()
            .filter(|entry| entry.starts_with("stop"))
            .collect();
        // Load order is a, careless, b (careless has no dependencies and
        // extracts with a; b waits on a). Stop runs the exact reverse, and a
        // failing stop hook does not halt the pass.
        assert_eq!(stops, ["stop core:b", "stop core:careless", "stop core:a"]);
    }

    #[tokio::test]
    async fn lifecycle_operations_enforce_service_state() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.build();

        assert!(matches!(
            service.start(CancellationToken::new()).await.unwrap_err(),
            ServiceError::InvalidState { operation: "start", .. }
        ));
        assert!(matches!(
            service
                .load(&id("core:a"), CancellationToken::new())
                .await
                .unwrap_err(),
            ServiceError::InvalidState { operation: "load", .. }
        ));

        service.setup(CancellationToken::new()).await.unwrap();
        assert!(matches!(
            service.setup(CancellationToken::new()).await.unwrap_err(),
            ServiceError::InvalidState { operation: "setup", .. }
        ));
    }

    #[tokio::test]
    async fn has_plugin_checks_the_version_range() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.2.3"), Faults::default());
        let (service, _) = h.boot().await;

        let a = id("core:a");
        assert!(service.has_plugin(&a, &VersionReq::STAR));
        assert!(service.has_plugin(&a, &VersionReq::parse(">=1.0.0").unwrap()));
        assert!(!service.has_plugin(&a, &VersionReq::parse(">=2.0.0").unwrap()));
        assert!(!service.has_plugin(&id("core:ghost"), &VersionReq::STAR));
    }

    #[tokio::test]
    async fn get_plugin_reports_unknown_identifiers() {
        let mut h = Harness::new();
        h.plugin(manifest("a", "1.0.0"), Faults::default());
        let (service, _) = h.boot().await;

        assert!(matches!(
            service.get_plugin(&id("core:ghost")).unwrap_err(),
            ServiceError::UnknownPlugin(_)
        ));
        assert!(service.try_get_plugin(&id("core:a")).is_some());
    }

    #[tokio::test]
    async fn sub_plugins_load_after_their_parent() {
        let mut parent = manifest("parent", "1.0.0");
        parent.sub_plugins = vec![PluginManifest {
            name: "child".into(),
            main: Some("test.child".into()),
            ..Default::default()
        }];

        let mut h = Harness::new();
        let journal = Arc::clone(&h.journal);
        h.factory.register("test.child", move || {
            Box::new(ScriptedPlugin {
                journal: Arc::clone(&journal),
                faults: Faults::default(),
            })
        });
        h.plugin(parent, Faults::default());
        let (service, journal) = h.boot().await;

        assert_eq!(
            service.get_plugin(&id("core:child")).unwrap().state(),
            PluginState::Enabled
        );
        let log = entries(&journal);
        let parent_setup = log.iter().position(|e| e == "setup core:parent").unwrap();
        let child_setup = log.iter().position(|e| e == "setup core:child").unwrap();
        assert!(parent_setup < child_setup);
    }
}
