//! Live plugin instances.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};
use vessel_core::{
    Plugin, PluginContext, PluginIdentifier, PluginManifest, PluginResult, PluginState, Version,
};

/// A constructed plugin instance owned by the service.
///
/// The handle pairs the immutable identity (identifier, manifest, the
/// plugin-scoped tracing span) with the two pieces of mutable state:
///
/// - the lifecycle state, behind a non-suspending lock so queries can read
///   it concurrently with lifecycle operations;
/// - the boxed [`Plugin`], behind an async lock because hook calls suspend.
///
/// Lifecycle transitions mutate the state field only; the manifest is never
/// modified after registration.
pub struct PluginHandle {
    id: PluginIdentifier,
    manifest: Arc<PluginManifest>,
    state: Mutex<PluginState>,
    plugin: tokio::sync::Mutex<Box<dyn Plugin>>,
    span: Span,
}

impl PluginHandle {
    pub(crate) fn new(
        id: PluginIdentifier,
        manifest: Arc<PluginManifest>,
        plugin: Box<dyn Plugin>,
    ) -> Self {
        let span = tracing::info_span!("plugin", id = %id);
        Self {
            id,
            manifest,
            state: Mutex::new(PluginState::None),
            plugin: tokio::sync::Mutex::new(plugin),
            span,
        }
    }

    /// This plugin's identifier.
    pub fn id(&self) -> &PluginIdentifier {
        &self.id
    }

    /// The declared manifest.
    pub fn manifest(&self) -> &Arc<PluginManifest> {
        &self.manifest
    }

    /// Declared version, when the manifest carries one.
    pub fn version(&self) -> Option<&Version> {
        self.manifest.version.as_ref()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PluginState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: PluginState) {
        *self.state.lock() = state;
    }

    fn context(&self, cancel: &CancellationToken) -> PluginContext {
        PluginContext::new(Arc::clone(&self.manifest), self.id.clone(), cancel.clone())
    }

    fn stage_span(&self, stage: &'static str) -> Span {
        tracing::info_span!(parent: &self.span, "lifecycle", stage)
    }

    pub(crate) async fn call_setup(&self, cancel: &CancellationToken) -> PluginResult<()> {
        let ctx = self.context(cancel);
        let mut plugin = self.plugin.lock().await;
        plugin.setup(&ctx).instrument(self.stage_span("setup")).await
    }

    pub(crate) async fn call_start(&self, cancel: &CancellationToken) -> PluginResult<()> {
        let ctx = self.context(cancel);
        let mut plugin = self.plugin.lock().await;
        plugin.start(&ctx).instrument(self.stage_span("start")).await
    }

    pub(crate) async fn call_stop(&self, cancel: &CancellationToken) -> PluginResult<()> {
        let ctx = self.context(cancel);
        let mut plugin = self.plugin.lock().await;
        plugin.stop(&ctx).instrument(self.stage_span("stop")).await
    }
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
