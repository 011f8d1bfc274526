//! Host assembly: registry bootstrap, coordinator and retention sweeper

use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wps_core::{
    AlgorithmRegistry, AlgorithmTable, DataBinder, ExecutionCoordinator, FormatRegistry,
    MemoryJobRepository, TracingEventHandler,
};
use wps_monitoring::LogExt;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// A running engine host
pub struct WpsServer {
    config: ServerConfig,
    coordinator: ExecutionCoordinator,
}

impl WpsServer {
    /// Register the configured processes from `table` and assemble the coordinator.
    ///
    /// Individual registration failures are logged; the build only fails when
    /// processes were configured and none of them could be registered.
    pub fn build(
        config: ServerConfig,
        table: AlgorithmTable,
        formats: FormatRegistry,
    ) -> ServerResult<Self> {
        let versions = config.supported_versions()?;
        let source = table.select(config.algorithms.iter().cloned());
        let registry = Arc::new(AlgorithmRegistry::with_versions(Arc::new(source), versions));

        let report = registry.register_all();
        for (id, error) in &report.failed {
            warn!(process_id = %id, error = %error, "Process not available");
        }
        if report.loaded.is_empty() && !report.failed.is_empty() {
            return Err(ServerError::NoProcesses {
                failed: report.failed.len(),
            });
        }
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Process registry ready"
        );

        let coordinator = ExecutionCoordinator::new(
            registry,
            DataBinder::new(Arc::new(formats)),
            Arc::new(MemoryJobRepository::new()),
            Arc::new(TracingEventHandler),
            config.coordinator_config(),
        );

        Ok(Self {
            config,
            coordinator,
        })
    }

    /// The execution coordinator
    pub fn coordinator(&self) -> &ExecutionCoordinator {
        &self.coordinator
    }

    /// Server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the retention sweeper until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()>,
    {
        let stop = CancellationToken::new();
        let sweeper = self
            .coordinator
            .spawn_retention_sweeper(self.config.sweep_interval(), stop.clone());
        info!(
            sweep_interval_seconds = self.config.sweep_interval_seconds,
            "WPS server running"
        );

        shutdown.await;
        info!("Shutting down");

        stop.cancel();
        sweeper
            .await
            .map_err(|e| ServerError::InternalError(format!("Retention sweeper failed: {}", e)))
            .log_err("Retention sweeper did not stop cleanly")?;

        info!("Shutdown complete");
        Ok(())
    }
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
