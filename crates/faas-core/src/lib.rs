//! The invoker core: Window Registry, Model Table, Fleet-State Publisher,
//! the Container Proxy and Container Pool actors, prewarm management, the
//! health prober, and the Docker-backed `ContainerRuntime` implementation.

pub mod boundary;
pub mod config;
pub mod container_data;
pub mod docker_runtime;
pub mod error;
pub mod fleet_publisher;
pub mod health;
pub mod model_table;
pub mod pool;
pub mod prewarm;
pub mod proxy;
pub mod testing;
pub mod window_registry;

pub use boundary::{
    ActiveAckClient, ActivationStore, LogCollector, NoopAckClient, NoopActivationStore,
    NoopLogCollector,
};
pub use config::{CoreConfig, RedisConfig};
pub use container_data::{ContainerData, ProxyLegacyState};
pub use docker_runtime::DockerContainerRuntime;
pub use error::{CoreError, Result};
pub use fleet_publisher::FleetStatePublisher;
pub use model_table::{ModelConfig, ModelData, ModelTable};
pub use pool::{PoolHandle, PoolMessage, PoolSnapshot, PoolSpawnArgs};
pub use prewarm::{desired_count, PrewarmingConfig, ReactiveConfig};
pub use proxy::{ProxyHandle, ProxyMessage};
pub use testing::FakeContainerRuntime;
pub use window_registry::WindowRegistry;

use std::sync::Arc;

use faas_common::ContainerRuntime;

/// The ambient value threaded into Pool and Proxy at construction: the
/// process-wide config, model/window tables, fleet-state publisher, and
/// the boundary traits collapsed into one struct instead of scattered
/// global singletons.
pub struct CoreContext {
    pub config: CoreConfig,
    pub model_table: Arc<ModelTable>,
    pub window_registry: Arc<WindowRegistry>,
    pub publisher: Option<Arc<FleetStatePublisher>>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub ack_client: Arc<dyn ActiveAckClient>,
    pub store: Arc<dyn ActivationStore>,
    pub logs: Arc<dyn LogCollector>,
}

impl CoreContext {
    /// Starts the Pool actor, running one synchronous prewarm-adjustment
    /// pass as part of construction.
    pub fn spawn_pool(&self, prewarm_configs: Vec<PrewarmingConfig>) -> PoolHandle {
        pool::spawn(PoolSpawnArgs {
            config: self.config.clone(),
            runtime: self.runtime.clone(),
            ack_client: self.ack_client.clone(),
            store: self.store.clone(),
            logs: self.logs.clone(),
            model_table: self.model_table.clone(),
            window_registry: self.window_registry.clone(),
            publisher: self.publisher.clone(),
            prewarm_configs,
        })
    }
}
