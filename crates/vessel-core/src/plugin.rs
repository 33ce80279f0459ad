//! Plugin behaviour and instance construction.
//!
//! A plugin implements [`Plugin`]: three async lifecycle hooks driven by the
//! service in resolved load order. Hooks receive a [`PluginContext`] carrying
//! the plugin's manifest, its identifier, and the cancellation token for the
//! current operation. Hook errors are opaque to the engine; it logs them and
//! confines the fault to the failing plugin.
//!
//! Instances are built by the host-supplied [`PluginFactory`] from the
//! manifest's `main` type descriptor. [`StaticPluginFactory`] is the
//! in-binary implementation: a map from descriptor to constructor closure,
//! populated at host assembly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::FactoryError;
use crate::identifier::PluginIdentifier;
use crate::manifest::PluginManifest;

/// Boxed opaque error returned by plugin hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for plugin hooks.
pub type PluginResult<T> = Result<T, BoxError>;

// =============================================================================
// PluginContext
// =============================================================================

/// Per-invocation context handed to every lifecycle hook.
#[derive(Debug, Clone)]
pub struct PluginContext {
    manifest: Arc<PluginManifest>,
    id: PluginIdentifier,
    cancel: CancellationToken,
}

impl PluginContext {
    /// Creates a context for one hook invocation.
    pub fn new(
        manifest: Arc<PluginManifest>,
        id: PluginIdentifier,
        cancel: CancellationToken,
    ) -> Self {
        Self { manifest, id, cancel }
    }

    /// The declared manifest of this plugin.
    pub fn manifest(&self) -> &PluginManifest {
        &self.manifest
    }

    /// This plugin's identifier.
    pub fn id(&self) -> &PluginIdentifier {
        &self.id
    }

    /// Cancellation token for the current lifecycle operation.
    ///
    /// Setup and start hooks are expected to observe it and return early;
    /// the token handed to stop hooks never fires.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Whether the current operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// =============================================================================
// Plugin trait
// =============================================================================

/// Lifecycle hooks of a plugin instance.
///
/// All hooks default to no-ops, so a plugin implements only the stages it
/// cares about. Hooks may suspend; the service never runs two lifecycle
/// operations concurrently, so `&mut self` is exclusive for the duration of a
/// hook.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// First lifecycle stage. Runs once per load, after every hard dependency
    /// has completed its own setup.
    async fn setup(&mut self, ctx: &PluginContext) -> PluginResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Second lifecycle stage. Runs after every hard dependency is enabled.
    async fn start(&mut self, ctx: &PluginContext) -> PluginResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Teardown. Runs to completion; errors are logged, never propagated.
    async fn stop(&mut self, ctx: &PluginContext) -> PluginResult<()> {
        let _ = ctx;
        Ok(())
    }
}

// =============================================================================
// Instance factory
// =============================================================================

/// Consumed interface: constructs a plugin instance from its manifest's
/// `main` type descriptor.
pub trait PluginFactory: Send + Sync {
    /// Builds the instance for `manifest`.
    ///
    /// # Errors
    ///
    /// Fails when the manifest has no entry point or the descriptor resolves
    /// to nothing constructible.
    fn construct(&self, manifest: &PluginManifest) -> Result<Box<dyn Plugin>, FactoryError>;
}

type Constructor = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// Factory backed by a static descriptor → constructor map.
///
/// The in-binary analog of a service locator: the host registers one
/// constructor per known `main` descriptor when it assembles the service.
#[derive(Default)]
pub struct StaticPluginFactory {
    constructors: HashMap<String, Constructor>,
}

impl StaticPluginFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `descriptor`, replacing any previous one.
    pub fn register<F>(&mut self, descriptor: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.constructors
            .insert(descriptor.into(), Box::new(constructor));
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<F>(mut self, descriptor: impl Into<String>, constructor: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.register(descriptor, constructor);
        self
    }
}

impl PluginFactory for StaticPluginFactory {
    fn construct(&self, manifest: &PluginManifest) -> Result<Box<dyn Plugin>, FactoryError> {
        let descriptor = manifest
            .main
            .as_deref()
            .filter(|main| !main.is_empty())
            .ok_or_else(|| FactoryError::NoEntryPoint {
                plugin: manifest.name.clone(),
            })?;
        let constructor = self.constructors.get(descriptor).ok_or_else(|| {
            FactoryError::UnknownDescriptor {
                descriptor: descriptor.to_string(),
            }
        })?;
        Ok(constructor())
    }
}
