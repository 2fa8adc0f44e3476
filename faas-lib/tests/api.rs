use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;

use faas_common::{ActionLimits, ActionRef, ActivationMessage, ActivationWindows};
use faas_core::{
    CoreConfig, CoreContext, FakeContainerRuntime, ModelTable, NoopAckClient,
    NoopActivationStore, NoopLogCollector, WindowRegistry,
};
use faas_invoker_lib::api_server::{create_app, ApiServerConfig, ApiState};
use faas_orchestrator::Orchestrator;
use reqwest::Client;
use tokio::sync::oneshot;
use uuid::Uuid;

struct ApiTestServer {
    base_url: String,
    shutdown: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

async fn spawn_api_server() -> Result<ApiTestServer, Box<dyn std::error::Error>> {
    let context = CoreContext {
        config: CoreConfig::default(),
        model_table: Arc::new(ModelTable::new()),
        window_registry: Arc::new(WindowRegistry::new()),
        publisher: None,
        runtime: Arc::new(FakeContainerRuntime::new()),
        ack_client: Arc::new(NoopAckClient),
        store: Arc::new(NoopActivationStore),
        logs: Arc::new(NoopLogCollector),
    };
    let pool = context.spawn_pool(Vec::new());
    let orchestrator = Arc::new(Orchestrator::new(pool.clone()));
    orchestrator.registry().register(
        ActionRef {
            namespace: "guest".into(),
            name: "ptest01".into(),
            kind: "python:3".into(),
        },
        ActionLimits::default(),
    )?;

    let state = ApiState { orchestrator, pool };
    let app = create_app(state);

    let listener = StdTcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    listener.set_nonblocking(true)?;
    let listener = tokio::net::TcpListener::from_std(listener)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        let _ = shutdown_rx.await;
    });
    let handle = tokio::spawn(async move {
        if let Err(err) = server.await {
            panic!("API server error: {err}");
        }
    });

    Ok(ApiTestServer {
        base_url: format!("http://127.0.0.1:{port}"),
        shutdown: shutdown_tx,
        handle,
    })
}

fn sample_activation(action_name: &str) -> ActivationMessage {
    ActivationMessage {
        namespace: "guest".into(),
        action: ActionRef {
            namespace: "guest".into(),
            name: action_name.into(),
            kind: "python:3".into(),
        },
        transaction_id: "tx-1".into(),
        activation_id: Uuid::new_v4(),
        blocking: false,
        init_args: HashMap::new(),
        locked_args: None,
        windows: ActivationWindows::default(),
    }
}

#[tokio::test]
async fn healthz_returns_ok() -> Result<(), Box<dyn std::error::Error>> {
    let server = spawn_api_server().await?;
    let client = Client::new();

    let response = client
        .get(format!("{}/healthz", server.base_url))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let _ = server.shutdown.send(());
    let _ = server.handle.await;
    Ok(())
}

#[tokio::test]
async fn registered_action_is_accepted() -> Result<(), Box<dyn std::error::Error>> {
    let server = spawn_api_server().await?;
    let client = Client::new();

    let response = client
        .post(format!("{}/activations", server.base_url))
        .json(&sample_activation("ptest01"))
        .send()
        .await?;
    assert_eq!(response.status(), 202);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["accepted"], true);

    let _ = server.shutdown.send(());
    let _ = server.handle.await;
    Ok(())
}

#[tokio::test]
async fn unregistered_action_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let server = spawn_api_server().await?;
    let client = Client::new();

    let response = client
        .post(format!("{}/activations", server.base_url))
        .json(&sample_activation("unknown-action"))
        .send()
        .await?;
    assert_eq!(response.status(), 404);

    let _ = server.shutdown.send(());
    let _ = server.handle.await;
    Ok(())
}

#[tokio::test]
async fn metrics_pool_reports_gauges() -> Result<(), Box<dyn std::error::Error>> {
    let server = spawn_api_server().await?;
    let client = Client::new();

    let response = client
        .get(format!("{}/metrics/pool", server.base_url))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert!(body["free"].is_u64());

    let _ = server.shutdown.send(());
    let _ = server.handle.await;
    Ok(())
}
