//! Process-level wiring for the invoker binary: builds the `CoreContext`,
//! spawns the Container Pool, and exposes the Axum HTTP surface that wires
//! the reactive core up to an ingress transport.

pub mod api_routes;
pub mod api_server;
pub mod context;

use std::sync::Arc;

use faas_core::{CoreContext, ModelConfig, PoolHandle, PrewarmingConfig};
use faas_orchestrator::{ActionConfig, Orchestrator};
use tracing::warn;

pub use api_server::{serve, ApiServerConfig, ApiState};

/// Assembles the running invoker: context, pool, and orchestrator façade,
/// ready to be handed to `api_server::serve`. `action_configs`/
/// `model_configs` seed the `ActionRegistry`/`ModelTable` the way
/// `prewarm_configs` seeds the prewarm pool; a deploy-time action or model
/// absent from these lists can never be scheduled or pre-loaded.
pub async fn bootstrap(
    prewarm_configs: Vec<PrewarmingConfig>,
    action_configs: Vec<ActionConfig>,
    model_configs: Vec<ModelConfig>,
) -> Result<(PoolHandle, Arc<Orchestrator>), faas_core::CoreError> {
    let context: CoreContext = context::build_context().await?;
    for model in model_configs {
        context.model_table.register(model.into());
    }
    let pool = context.spawn_pool(prewarm_configs);
    let orchestrator = Arc::new(Orchestrator::new(pool.clone()));
    for cfg in action_configs {
        if let Err(err) = orchestrator.registry().register(cfg.action, cfg.limits) {
            warn!(%err, "failed to register action from FAAS_ACTIONS_CONFIG");
        }
    }
    Ok((pool, orchestrator))
}
