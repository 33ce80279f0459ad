//! Host run loop.
//!
//! [`Host`] wires a [`PluginService`] to process-level concerns: the boot
//! sequence, shutdown signals, and the cancellation token handed to plugin
//! hooks. The plugin core never touches signals itself.

use std::future::Future;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use vessel_core::{CandidateUnit, PluginFactory, Version};
use vessel_plugins::{PluginService, ServiceResult};

/// Owns the plugin service and drives it from boot to shutdown.
///
/// # Example
///
/// ```rust,ignore
/// use vessel_runtime::{Host, HostConfig, LoggingBuilder};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let config = HostConfig::load()?;
///     let _guard = LoggingBuilder::new().directive(&config.log_level).init();
///
///     let host = Host::new(config.server_version, factory, candidates)?;
///     host.run().await?;
///     Ok(())
/// }
/// ```
pub struct Host {
    service: Arc<PluginService>,
    shutdown: CancellationToken,
}

impl Host {
    /// Assembles the service from the host version, the instance factory,
    /// and the full candidate set.
    ///
    /// # Errors
    ///
    /// Fails when candidate registration fails (duplicate identifier or
    /// invalid manifest).
    pub fn new(
        server_version: Version,
        factory: Arc<dyn PluginFactory>,
        candidates: Vec<CandidateUnit>,
    ) -> ServiceResult<Self> {
        let service = PluginService::new(server_version, factory, candidates)?;
        Ok(Self {
            service: Arc::new(service),
            shutdown: CancellationToken::new(),
        })
    }

    /// The underlying plugin service, for runtime operations and queries.
    pub fn service(&self) -> &Arc<PluginService> {
        &self.service
    }

    /// A token that fires when the host begins shutting down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Requests shutdown from outside the run loop.
    pub fn trigger_shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Boots the service and runs until a shutdown signal arrives, then
    /// stops it. Stop always runs to completion, even when boot was
    /// interrupted.
    ///
    /// # Errors
    ///
    /// Propagates boot failures (invalid service state, unresolvable load
    /// order). The service is still stopped before the error is returned.
    pub async fn run(&self) -> ServiceResult<()> {
        self.run_until(Self::wait_for_signal()).await
    }

    /// Like [`run`](Self::run), but shuts down when `shutdown` completes
    /// instead of waiting for process signals. Useful for embedding and
    /// tests.
    pub async fn run_until<F>(&self, shutdown: F) -> ServiceResult<()>
    where
        F: Future<Output = ()>,
    {
        let boot = self.boot().await;
        if boot.is_ok() {
            info!("vessel host is running");
            tokio::select! {
                () = shutdown => info!("shutdown requested"),
                () = self.shutdown.cancelled() => info!("shutdown triggered"),
            }
        }
        self.shutdown.cancel();
        self.service.stop().await;
        boot
    }

    async fn boot(&self) -> ServiceResult<()> {
        self.service.setup(self.shutdown.child_token()).await?;
        self.service.start(self.shutdown.child_token()).await
    }

    /// Completes on Ctrl+C or, on Unix, SIGTERM.
    async fn wait_for_signal() {
        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = signal::ctrl_c() => info!("received Ctrl+C"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("failed to listen for Ctrl+C");
            info!("received Ctrl+C");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vessel_core::{Plugin, PluginManifest, PluginState, StaticPluginFactory};

    struct NoopPlugin;

    #[async_trait]
    impl Plugin for NoopPlugin {}

    fn host_with_one_plugin() -> Host {
        let manifest = PluginManifest {
            group: "core".into(),
            name: "noop".into(),
            version: Some(Version::new(1, 0, 0)),
            main: Some("test.noop".into()),
            ..Default::default()
        };
        let factory = StaticPluginFactory::new().with("test.noop", || Box::new(NoopPlugin));
        Host::new(
            Version::new(1, 0, 0),
            Arc::new(factory),
            vec![CandidateUnit::core(manifest).unwrap()],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn run_until_boots_and_stops() {
        let host = host_with_one_plugin();
        host.run_until(async {}).await.unwrap();

        assert_eq!(host.service().state(), PluginState::Shutdown);
        assert!(host.service().plugins().is_empty());
    }

    #[tokio::test]
    async fn trigger_shutdown_ends_the_run_loop() {
        let host = host_with_one_plugin();
        host.trigger_shutdown();
        host.run_until(std::future::pending::<()>()).await.unwrap();

        assert_eq!(host.service().state(), PluginState::Shutdown);
    }

    #[tokio::test]
    async fn boot_failure_still_stops_the_service() {
        let manifest = PluginManifest {
            group: "core".into(),
            name: "orphan".into(),
            version: Some(Version::new(1, 0, 0)),
            main: Some("test.orphan".into()),
            dependencies: [(
                "core:missing".parse().unwrap(),
                semver::VersionReq::STAR,
            )]
            .into(),
            ..Default::default()
        };
        let factory = StaticPluginFactory::new().with("test.orphan", || Box::new(NoopPlugin));
        let host = Host::new(
            Version::new(1, 0, 0),
            Arc::new(factory),
            vec![CandidateUnit::core(manifest).unwrap()],
        )
        .unwrap();

        assert!(host.run_until(async {}).await.is_err());
        assert_eq!(host.service().state(), PluginState::Shutdown);
    }
}
