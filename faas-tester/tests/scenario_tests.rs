//! End-to-end scenarios driving the Container Pool + Proxy actors through
//! `faas_core::testing::FakeContainerRuntime`, exercising the full state
//! machine without a Docker daemon.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use faas_common::{ActionLimits, ActionRef, ActivationMessage, ActivationWindows};
use faas_core::{
    CoreConfig, CoreContext, FakeContainerRuntime, ModelData, ModelTable, NoopAckClient,
    NoopActivationStore, NoopLogCollector, PoolHandle, PrewarmingConfig, WindowRegistry,
};
use uuid::Uuid;

fn action(name: &str) -> ActionRef {
    ActionRef {
        namespace: "guest".into(),
        name: name.into(),
        kind: "python:3".into(),
    }
}

fn activation(name: &str, windows: ActivationWindows) -> ActivationMessage {
    ActivationMessage {
        namespace: "guest".into(),
        action: action(name),
        transaction_id: format!("tx-{name}"),
        activation_id: Uuid::new_v4(),
        blocking: false,
        init_args: HashMap::new(),
        locked_args: None,
        windows,
    }
}

fn limits() -> ActionLimits {
    ActionLimits {
        max_concurrent: 1,
        memory_mb: 256,
        timeout_ms: 30_000,
    }
}

/// Builds a Pool over the fake runtime with a short `default_unused_timeout`
/// so RunningToUser -> Zygote transitions happen inside a test's lifetime,
/// and returns the runtime handle alongside the pool for introspection.
fn spawn_test_pool(
    unused_timeout: Duration,
    prewarm_configs: Vec<PrewarmingConfig>,
    model_table: Arc<ModelTable>,
) -> (PoolHandle, Arc<FakeContainerRuntime>) {
    let runtime = Arc::new(FakeContainerRuntime::new());
    let context = CoreContext {
        config: CoreConfig {
            default_unused_timeout: unused_timeout,
            ..CoreConfig::default()
        },
        model_table,
        window_registry: Arc::new(WindowRegistry::new()),
        publisher: None,
        runtime: runtime.clone(),
        ack_client: Arc::new(NoopAckClient),
        store: Arc::new(NoopActivationStore),
        logs: Arc::new(NoopLogCollector),
    };
    let pool = context.spawn_pool(prewarm_configs);
    (pool, runtime)
}

#[tokio::test]
async fn cold_start_then_warm_reuse() {
    let (pool, runtime) = spawn_test_pool(Duration::from_secs(60), Vec::new(), Arc::new(ModelTable::new()));

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest01", ActivationWindows::default()),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(runtime.container_count(), 1, "first run should cold-start one container");

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest01", ActivationWindows::default()),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        runtime.container_count(),
        1,
        "second run of the same action should reuse the warm container"
    );

    let snapshot = pool.snapshot().await.expect("pool still running");
    assert_eq!(snapshot.cold_start_count, 1);
}

#[tokio::test]
async fn prewarm_hit_is_consumed_before_cold_start() {
    let prewarm = PrewarmingConfig {
        initial_count: 1,
        kind: "python:3".into(),
        memory_mb: 256,
        reactive: None,
    };
    let (pool, runtime) = spawn_test_pool(Duration::from_secs(60), vec![prewarm], Arc::new(ModelTable::new()));

    // `Pool::new`'s synchronous adjustment pass starts the configured prewarm.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(runtime.container_count(), 1, "initial prewarm should have started");

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest02", ActivationWindows::default()),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(150)).await;

    let snapshot = pool.snapshot().await.expect("pool still running");
    assert_eq!(
        snapshot.cold_start_count, 0,
        "consuming a matching prewarm must not count as a cold start"
    );
}

#[tokio::test]
async fn pre_load_hit_lets_a_foreign_action_reuse_a_hosting_container() {
    let model_table = Arc::new(ModelTable::new());
    // ptest04 must itself be inference-eligible to become a zygote/pre-load
    // host; its own model is distinct from the one ptest05 comes to reuse.
    model_table.register(ModelData::new("ptest04", "MobileNet", 200, 800));
    model_table.register(ModelData::new("ptest05", "ResNet50", 600, 2_000));

    let (pool, runtime) = spawn_test_pool(Duration::from_millis(80), Vec::new(), model_table);

    // ptest04 runs, completes, idles into the zygote pool, and is offered
    // ResNet50 (registered against ptest05) via the opportunistic loader.
    let fast_windows = ActivationWindows {
        pre_warm_minutes: 0,
        keep_alive_minutes: 0,
        pre_load_minutes: 0,
        off_load_minutes: 0,
    };
    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest04", fast_windows),
        limits: limits(),
    });

    // idle timer (80ms) -> ContainerIdle -> staggered FirePreload (<=2.1s).
    tokio::time::sleep(Duration::from_millis(2_600)).await;

    let ids = runtime.container_ids();
    assert_eq!(ids.len(), 1);
    let resident = runtime.loaded_models(&ids[0]);
    assert!(resident.contains(&"ResNet50".to_string()), "resident models: {resident:?}");

    // ptest05 (ResNet50's owning action) should now schedule onto the same
    // container instead of cold-starting a new one.
    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest05", fast_windows),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        runtime.container_count(),
        1,
        "ptest05 should land on the container already hosting ResNet50"
    );
}

#[tokio::test]
async fn ineligible_action_never_enters_the_shared_pool() {
    // No model registered for ptest11 at all: idling must not make its
    // container a zygote/pre-load host.
    let model_table = Arc::new(ModelTable::new());

    let (pool, runtime) = spawn_test_pool(Duration::from_millis(80), Vec::new(), model_table);

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest11", ActivationWindows::default()),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(2_600)).await;

    assert_eq!(runtime.container_ids().len(), 1);
    let snapshot = pool.snapshot().await.expect("pool still running");
    assert_eq!(snapshot.zygote, 0, "a non-eligible action must never join the shared pool");
}

#[tokio::test]
async fn opportunistic_pre_load_on_idle_populates_the_preload_table() {
    let model_table = Arc::new(ModelTable::new());
    model_table.register(ModelData::new("ptest06", "Bert", 500, 1_500));

    let (pool, runtime) = spawn_test_pool(Duration::from_millis(80), Vec::new(), model_table);

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest06", ActivationWindows::default()),
        limits: limits(),
    });

    tokio::time::sleep(Duration::from_millis(2_600)).await;

    let ids = runtime.container_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(runtime.loaded_models(&ids[0]), vec!["Bert".to_string()]);
}

#[tokio::test]
async fn bin_packing_evicts_the_lowest_saved_latency_resident_model() {
    let model_table = Arc::new(ModelTable::new());
    // Occupant model: almost fills the 2047 MB budget, low value.
    model_table.register(ModelData::new("ptest07", "Occupant", 1_990, 1_000));
    model_table.update_lambda("ptest07", 0.0001); // tiny arrival probability -> tiny saved latency
    // Challenger model: needs room, much higher loading latency.
    model_table.register(ModelData::new("ptest08", "Challenger", 600, 50_000));
    model_table.update_lambda("ptest08", 5.0); // near-certain arrival -> high saved latency

    let (pool, runtime) = spawn_test_pool(Duration::from_millis(80), Vec::new(), model_table);

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest07", ActivationWindows::default()),
        limits: limits(),
    });

    tokio::time::sleep(Duration::from_millis(3_000)).await;

    let ids = runtime.container_ids();
    assert_eq!(ids.len(), 1);
    let resident = runtime.loaded_models(&ids[0]);
    assert!(
        resident.contains(&"Challenger".to_string()),
        "higher-value model should have been placed: {resident:?}"
    );
}

#[tokio::test]
async fn health_probe_failure_recycles_the_container() {
    let mut config = CoreConfig::default();
    config.health_check_period = Duration::from_millis(20);
    config.health_check_max_fails = 2;
    config.default_unused_timeout = Duration::from_secs(60);

    let runtime = Arc::new(FakeContainerRuntime::new());
    let context = CoreContext {
        config,
        model_table: Arc::new(ModelTable::new()),
        window_registry: Arc::new(WindowRegistry::new()),
        publisher: None,
        runtime: runtime.clone(),
        ack_client: Arc::new(NoopAckClient),
        store: Arc::new(NoopActivationStore),
        logs: Arc::new(NoopLogCollector),
    };
    let pool = context.spawn_pool(Vec::new());

    pool.send(faas_core::PoolMessage::Run {
        activation: activation("ptest10", ActivationWindows::default()),
        limits: limits(),
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(runtime.container_count(), 1);

    // The fake runtime's container address is not a dialable host:port, so
    // every health probe tick fails; after `max_fails` the Proxy destroys
    // the container and moves to Removing.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let snapshot = pool.snapshot().await.expect("pool still running");
    assert_eq!(
        snapshot.busy + snapshot.free,
        0,
        "the unhealthy container should have left both live pools: {snapshot:?}"
    );
}
