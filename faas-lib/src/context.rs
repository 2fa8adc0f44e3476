//! Builds the invoker's ambient `CoreContext` from the process environment:
//! the container runtime, the fleet-state publisher, and the model/window
//! tables. The ingress boundary is plain HTTP.

use std::sync::Arc;

use faas_common::ContainerRuntime;
use faas_core::{
    ActiveAckClient, ActivationStore, CoreConfig, CoreContext, DockerContainerRuntime,
    FakeContainerRuntime, FleetStatePublisher, LogCollector, ModelTable, NoopAckClient,
    NoopActivationStore, NoopLogCollector, WindowRegistry,
};
use tracing::{info, warn};

/// Selects the `ContainerRuntime` backing the pool: a live Docker daemon by
/// default, or the in-memory fake when `FAAS_RUNTIME=fake` (used by
/// `faas-tester` and local smoke runs without a Docker socket).
async fn build_runtime() -> Result<Arc<dyn ContainerRuntime>, faas_core::CoreError> {
    match std::env::var("FAAS_RUNTIME").as_deref() {
        Ok("fake") => {
            info!("container runtime: in-memory fake (FAAS_RUNTIME=fake)");
            Ok(Arc::new(FakeContainerRuntime::new()))
        }
        _ => {
            let docker = docktopus::bollard::Docker::connect_with_local_defaults()?;
            let proxy_port = std::env::var("FAAS_CONTAINER_PROXY_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000);
            info!(proxy_port, "container runtime: docker");
            Ok(Arc::new(DockerContainerRuntime::new(
                Arc::new(docker),
                proxy_port,
            )))
        }
    }
}

/// Connects the fleet-state publisher when Redis is reachable; single-invoker
/// deployments can run without a Redis sidecar at all
/// (`FAAS_REDIS_ENABLED=false` skips it outright).
fn build_publisher(config: &CoreConfig) -> Option<Arc<FleetStatePublisher>> {
    if std::env::var("FAAS_REDIS_ENABLED").as_deref() == Ok("false") {
        info!("fleet-state publisher disabled (FAAS_REDIS_ENABLED=false)");
        return None;
    }
    match FleetStatePublisher::connect(&config.redis) {
        Ok(publisher) => Some(Arc::new(publisher)),
        Err(err) => {
            warn!(%err, "fleet-state publisher unavailable, continuing without it");
            None
        }
    }
}

/// Builds the `CoreContext` threaded into the Pool/Proxy actors for this
/// process's lifetime.
pub async fn build_context() -> Result<CoreContext, faas_core::CoreError> {
    let config = CoreConfig::from_env();
    let runtime = build_runtime().await?;
    let publisher = build_publisher(&config);

    let ack_client: Arc<dyn ActiveAckClient> = Arc::new(NoopAckClient);
    let store: Arc<dyn ActivationStore> = Arc::new(NoopActivationStore);
    let logs: Arc<dyn LogCollector> = Arc::new(NoopLogCollector);

    Ok(CoreContext {
        config,
        model_table: Arc::new(ModelTable::new()),
        window_registry: Arc::new(WindowRegistry::new()),
        publisher,
        runtime,
        ack_client,
        store,
        logs,
    })
}
